//! # Invoice Routes
//!
//! Invoice lifecycle (draft, issue, pay, void). A payment mutates the
//! invoice and appends its Income transaction under one finance lock,
//! so the two can never disagree.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use cfs_core::{money, InvoiceId};
use cfs_ledger::{FinanceBook, Invoice};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::parse_timestamp;
use crate::state::AppState;

/// Request to create a draft invoice.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    /// Total due as a positive decimal string, e.g. `"350.00"`.
    pub amount_due: String,
}

impl Validate for CreateInvoiceRequest {
    fn validate(&self) -> Result<(), String> {
        let cents = money::parse_amount(&self.amount_due).map_err(|e| e.to_string())?;
        if cents <= 0 {
            return Err("amount_due must be positive".to_string());
        }
        Ok(())
    }
}

/// Request to record a payment against an invoice.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    /// Payment as a positive decimal string.
    pub amount: String,
    /// When the payment was received, RFC 3339. Defaults to now.
    pub paid_at: Option<String>,
}

impl Validate for RecordPaymentRequest {
    fn validate(&self) -> Result<(), String> {
        let cents = money::parse_amount(&self.amount).map_err(|e| e.to_string())?;
        if cents <= 0 {
            return Err("amount must be positive".to_string());
        }
        Ok(())
    }
}

/// An invoice and its payment progress.
#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceResponse {
    /// Invoice id.
    pub id: Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Total due as a decimal string.
    pub amount_due: String,
    /// Paid so far as a decimal string.
    pub amount_paid: String,
    /// Outstanding remainder as a decimal string.
    pub amount_outstanding: String,
    /// Creation instant, RFC 3339.
    pub created_at: String,
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: *invoice.id.as_uuid(),
            status: invoice.status.as_str().to_string(),
            amount_due: money::format_amount(invoice.amount_due_cents),
            amount_paid: money::format_amount(invoice.amount_paid_cents),
            amount_outstanding: money::format_amount(
                invoice.amount_due_cents - invoice.amount_paid_cents,
            ),
            created_at: invoice.created_at.to_rfc3339(),
        }
    }
}

/// Routes under `/api/v1/invoices`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/invoices", get(list_invoices).post(create_invoice))
        .route("/api/v1/invoices/{id}", get(get_invoice))
        .route("/api/v1/invoices/{id}/issue", post(issue_invoice))
        .route("/api/v1/invoices/{id}/void", post(void_invoice))
        .route("/api/v1/invoices/{id}/payments", post(record_payment))
}

async fn create_invoice(
    State(state): State<AppState>,
    body: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let amount_due_cents = money::parse_amount(&req.amount_due)?;

    let mut finance = state.finance.write();
    let id = finance.invoices.create(amount_due_cents, Utc::now())?;
    tracing::info!(invoice_id = %id, amount_due_cents, "invoice created");
    let invoice = finance
        .invoices
        .get(id)
        .ok_or_else(|| AppError::Internal("invoice vanished after insert".to_string()))?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

async fn issue_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice_id = InvoiceId::from_uuid(id);
    let mut finance = state.finance.write();
    let invoice = finance.invoices.issue(invoice_id)?;
    tracing::info!(%invoice_id, "invoice issued");
    Ok(Json(invoice.into()))
}

async fn void_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice_id = InvoiceId::from_uuid(id);
    let mut finance = state.finance.write();
    let invoice = finance.invoices.void(invoice_id)?;
    tracing::info!(%invoice_id, "invoice voided");
    Ok(Json(invoice.into()))
}

async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let invoice_id = InvoiceId::from_uuid(id);
    let payment_cents = money::parse_amount(&req.amount)?;
    let paid_at = match &req.paid_at {
        Some(value) => parse_timestamp("paid_at", value)?,
        None => Utc::now(),
    };

    // Invoice mutation and ledger append commit under one lock.
    let (committed, response) = {
        let mut finance = state.finance.write();
        let FinanceBook {
            invoices, ledger, ..
        } = &mut *finance;
        let committed = invoices.record_payment(invoice_id, payment_cents, paid_at, ledger)?;
        let invoice = invoices
            .get(invoice_id)
            .ok_or_else(|| AppError::Internal("invoice vanished after payment".to_string()))?;
        (committed, InvoiceResponse::from(invoice))
    };
    tracing::info!(%invoice_id, payment_cents, "invoice payment recorded");

    if let Some(pool) = &state.db_pool {
        crate::db::transactions::insert(pool, &committed).await?;
    }
    Ok(Json(response))
}

async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice_id = InvoiceId::from_uuid(id);
    let finance = state.finance.read();
    let invoice = finance
        .invoices
        .get(invoice_id)
        .ok_or_else(|| AppError::NotFound(format!("invoice {invoice_id} not found")))?;
    Ok(Json(invoice.into()))
}

async fn list_invoices(State(state): State<AppState>) -> Json<Vec<InvoiceResponse>> {
    let finance = state.finance.read();
    Json(finance.invoices.list().map(InvoiceResponse::from).collect())
}
