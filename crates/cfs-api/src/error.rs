//! # API Error Handling
//!
//! [`AppError`] is the single error type handlers return. It maps the
//! domain crates' typed failures onto HTTP semantics:
//!
//! - validation errors (bad amount, missing policy) → 422, no state
//!   changed;
//! - conflict errors (duplicate run, overlapping tax rule, illegal
//!   lifecycle transition, overpayment) → 409, existing state untouched;
//! - consistency faults (balance drift, overflow) and infrastructure
//!   failures → 500, with the detail logged server-side and hidden from
//!   the client.
//!
//! Responses are rendered as `{"error": {"code", "message"}}` so the UI
//! layer can show the specific failure reason instead of a generic
//! error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use cfs_core::MoneyError;
use cfs_ledger::LedgerError;
use cfs_payroll::PayrollError;
use cfs_tax::TaxError;

/// Application-level error, convertible into an HTTP response.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource does not exist. 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input was syntactically valid but violates a business rule. 422.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Request body could not be parsed. 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The operation conflicts with current state. 409.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal failure. The message is logged, never sent to clients.
    /// 500.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            // Internal details stay in the logs.
            Self::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::Overflow { .. } => Self::Internal(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}

impl From<TaxError> for AppError {
    fn from(err: TaxError) -> Self {
        match err {
            TaxError::OverlappingRule { .. } | TaxError::RuleInUse { .. } => {
                Self::Conflict(err.to_string())
            }
            TaxError::RuleNotFound { .. } => Self::NotFound(err.to_string()),
            TaxError::PolicyNotFound { .. } => Self::Validation(err.to_string()),
            TaxError::Money(inner) => inner.into(),
        }
    }
}

impl From<PayrollError> for AppError {
    fn from(err: PayrollError) -> Self {
        match err {
            PayrollError::PeriodNotFound { .. } | PayrollError::RunNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            PayrollError::DuplicateRun { .. }
            | PayrollError::InvalidPeriodTransition { .. }
            | PayrollError::InvalidRunTransition { .. } => Self::Conflict(err.to_string()),
            PayrollError::Tax(inner) => inner.into(),
            PayrollError::Ledger(inner) => inner.into(),
            PayrollError::Money(inner) => inner.into(),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount { .. } => Self::Validation(err.to_string()),
            LedgerError::InvoiceNotFound { .. } | LedgerError::BudgetNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            LedgerError::InvalidInvoiceTransition { .. } | LedgerError::Overpayment { .. } => {
                Self::Conflict(err.to_string())
            }
            // Consistency faults: never user-correctable.
            LedgerError::ArithmeticOverflow { .. } | LedgerError::BalanceDrift { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(format!("database error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfs_core::PeriodId;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn conflict_carries_specific_message() {
        let err: AppError = PayrollError::DuplicateRun {
            period_id: PeriodId::new(),
        }
        .into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("already exists"));
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let (status, body) = body_json(AppError::Internal("pool exhausted at 10.0.0.3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn validation_maps_to_422() {
        let err: AppError = TaxError::PolicyNotFound {
            role: "Janitor".into(),
        }
        .into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    }

    #[test]
    fn balance_drift_is_internal() {
        let err: AppError = LedgerError::BalanceDrift {
            cached_cents: 10,
            recomputed_cents: 20,
        }
        .into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
