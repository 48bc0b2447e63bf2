//! # Ledger Routes
//!
//! Manual transaction entry and ledger reads: balance, summary,
//! per-category totals, and the consistency check. Payroll and invoice
//! transactions enter the ledger through their own routes; this surface
//! covers everything else (fees, grants, supplies, utilities).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use cfs_core::money;
use cfs_ledger::{Transaction, TransactionDraft, TransactionRef, TransactionType};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::{parse_opt_timestamp, parse_timestamp};
use crate::state::AppState;

/// Request to record a manual ledger transaction.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordTransactionRequest {
    /// `INCOME` or `EXPENSE`. Payroll and invoice types are reserved
    /// for their own flows.
    #[serde(rename = "type")]
    pub tx_type: String,
    /// Signed decimal amount, e.g. `"500.00"` or `"-120.50"`.
    pub amount: String,
    /// Free-form category.
    pub category: String,
    /// When the transaction occurred, RFC 3339. Defaults to now.
    pub timestamp: Option<String>,
}

impl Validate for RecordTransactionRequest {
    fn validate(&self) -> Result<(), String> {
        parse_manual_type(&self.tx_type)?;
        if self.category.trim().is_empty() {
            return Err("category must not be empty".to_string());
        }
        money::parse_amount(&self.amount).map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn parse_manual_type(value: &str) -> Result<TransactionType, String> {
    match value {
        "INCOME" => Ok(TransactionType::Income),
        "EXPENSE" => Ok(TransactionType::Expense),
        "PAYROLL_DISBURSEMENT" | "INVOICE_SETTLEMENT" => Err(format!(
            "{value} transactions are recorded by their own endpoints"
        )),
        other => Err(format!("type must be INCOME or EXPENSE, got {other:?}")),
    }
}

/// One committed ledger transaction.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    /// Transaction id.
    pub id: Uuid,
    /// Classification.
    #[serde(rename = "type")]
    pub tx_type: String,
    /// Signed decimal amount.
    pub amount: String,
    /// Category.
    pub category: String,
    /// Occurrence instant, RFC 3339.
    pub timestamp: String,
    /// Originating record, if any.
    pub reference: Option<ReferenceResponse>,
}

/// Link back to a payroll run or invoice.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReferenceResponse {
    /// `payroll_run` or `invoice`.
    pub kind: String,
    /// Id of the originating record.
    pub id: Uuid,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: *tx.id.as_uuid(),
            tx_type: tx.tx_type.as_str().to_string(),
            amount: money::format_amount(tx.amount_cents),
            category: tx.category.clone(),
            timestamp: tx.timestamp.to_rfc3339(),
            reference: tx.reference.as_ref().map(|r| match r {
                TransactionRef::PayrollRun(id) => ReferenceResponse {
                    kind: "payroll_run".to_string(),
                    id: *id.as_uuid(),
                },
                TransactionRef::Invoice(id) => ReferenceResponse {
                    kind: "invoice".to_string(),
                    id: *id.as_uuid(),
                },
            }),
        }
    }
}

/// Income/expense/balance totals.
#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    /// Total money in, as a decimal string.
    pub income: String,
    /// Total money out (magnitude), as a decimal string.
    pub expense: String,
    /// Net balance, as a decimal string.
    pub balance: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// Range start, RFC 3339 (inclusive).
    pub from: Option<String>,
    /// Range end, RFC 3339 (inclusive).
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Point in time, RFC 3339. Omitted means the current balance.
    pub as_of: Option<String>,
}

/// Routes under `/api/v1/ledger`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/ledger/transactions",
            get(list_transactions).post(record_transaction),
        )
        .route("/api/v1/ledger/balance", get(balance))
        .route("/api/v1/ledger/summary", get(summary))
        .route("/api/v1/ledger/categories", get(totals_by_category))
        .route("/api/v1/ledger/verify", get(verify))
}

async fn record_transaction(
    State(state): State<AppState>,
    body: Result<Json<RecordTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let tx_type = parse_manual_type(&req.tx_type).map_err(AppError::Validation)?;
    let amount_cents = money::parse_amount(&req.amount)?;
    let timestamp = match &req.timestamp {
        Some(value) => parse_timestamp("timestamp", value)?,
        None => Utc::now(),
    };

    let committed = state.finance.write().ledger.record(TransactionDraft {
        tx_type,
        amount_cents,
        category: req.category,
        timestamp,
        reference: None,
    })?;
    tracing::info!(
        transaction_id = %committed.id,
        tx_type = %committed.tx_type,
        amount_cents = committed.amount_cents,
        "transaction recorded"
    );

    if let Some(pool) = &state.db_pool {
        crate::db::transactions::insert(pool, &committed).await?;
    }
    Ok((StatusCode::CREATED, Json((&committed).into())))
}

async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let from = parse_opt_timestamp("from", &query.from)?;
    let to = parse_opt_timestamp("to", &query.to)?;
    let finance = state.finance.read();
    Ok(Json(
        finance
            .ledger
            .range(from, to)
            .map(TransactionResponse::from)
            .collect(),
    ))
}

async fn balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let as_of = parse_opt_timestamp("as_of", &query.as_of)?;
    let finance = state.finance.read();
    let cents = match as_of {
        Some(instant) => finance.ledger.balance_as_of(instant),
        None => finance.ledger.balance(),
    };
    Ok(Json(serde_json::json!({
        "balance": money::format_amount(cents)
    })))
}

async fn summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let summary = state.finance.read().ledger.summary();
    Json(SummaryResponse {
        income: money::format_amount(summary.income_cents),
        expense: money::format_amount(summary.expense_cents),
        balance: money::format_amount(summary.balance_cents),
    })
}

async fn totals_by_category(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, String>>, AppError> {
    let from = parse_opt_timestamp("from", &query.from)?;
    let to = parse_opt_timestamp("to", &query.to)?;
    let finance = state.finance.read();
    Ok(Json(
        finance
            .ledger
            .totals_by_category(from, to)
            .into_iter()
            .map(|(category, cents)| (category, money::format_amount(cents)))
            .collect(),
    ))
}

async fn verify(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let finance = state.finance.read();
    finance.ledger.verify_balance()?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "balance": money::format_amount(finance.ledger.balance())
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn record_and_summarize() {
        let app = router().with_state(AppState::new());

        let (status, tx) = send(
            app.clone(),
            "POST",
            "/api/v1/ledger/transactions",
            Some(serde_json::json!({
                "type": "INCOME",
                "amount": "500.00",
                "category": "Fees",
                "timestamp": "2024-01-10T09:00:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(tx["amount"], "500.00");

        send(
            app.clone(),
            "POST",
            "/api/v1/ledger/transactions",
            Some(serde_json::json!({
                "type": "EXPENSE",
                "amount": "-120.50",
                "category": "Supplies",
                "timestamp": "2024-01-12T09:00:00Z"
            })),
        )
        .await;

        let (_, summary) = send(app.clone(), "GET", "/api/v1/ledger/summary", None).await;
        assert_eq!(summary["income"], "500.00");
        assert_eq!(summary["expense"], "120.50");
        assert_eq!(summary["balance"], "379.50");

        let (_, verify) = send(app, "GET", "/api/v1/ledger/verify", None).await;
        assert_eq!(verify["status"], "ok");
    }

    #[tokio::test]
    async fn sign_mismatch_is_validation_error() {
        let app = router().with_state(AppState::new());
        let (status, err) = send(
            app,
            "POST",
            "/api/v1/ledger/transactions",
            Some(serde_json::json!({
                "type": "INCOME",
                "amount": "-500.00",
                "category": "Fees"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"]["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn payroll_type_is_reserved() {
        let app = router().with_state(AppState::new());
        let (status, _) = send(
            app,
            "POST",
            "/api/v1/ledger/transactions",
            Some(serde_json::json!({
                "type": "PAYROLL_DISBURSEMENT",
                "amount": "-500.00",
                "category": "Salaries"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn balance_as_of_respects_range() {
        let app = router().with_state(AppState::new());
        for (amount, ts, tx_type) in [
            ("500.00", "2024-01-10T09:00:00Z", "INCOME"),
            ("-100.00", "2024-02-10T09:00:00Z", "EXPENSE"),
        ] {
            send(
                app.clone(),
                "POST",
                "/api/v1/ledger/transactions",
                Some(serde_json::json!({
                    "type": tx_type, "amount": amount,
                    "category": "Misc", "timestamp": ts
                })),
            )
            .await;
        }

        let (_, body) = send(
            app.clone(),
            "GET",
            "/api/v1/ledger/balance?as_of=2024-01-31T00:00:00Z",
            None,
        )
        .await;
        assert_eq!(body["balance"], "500.00");
        let (_, body) = send(app, "GET", "/api/v1/ledger/balance", None).await;
        assert_eq!(body["balance"], "400.00");
    }

    #[tokio::test]
    async fn categories_report_signed_totals() {
        let app = router().with_state(AppState::new());
        send(
            app.clone(),
            "POST",
            "/api/v1/ledger/transactions",
            Some(serde_json::json!({
                "type": "EXPENSE", "amount": "-200.00", "category": "Supplies"
            })),
        )
        .await;

        let (status, totals) = send(app, "GET", "/api/v1/ledger/categories", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(totals["Supplies"], "-200.00");
    }
}
