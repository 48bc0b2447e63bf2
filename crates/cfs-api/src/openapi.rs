//! # OpenAPI Specification Assembly
//!
//! Assembles the documented request/response schemas into one OpenAPI
//! spec served at `/openapi.json`, the contract the administration UI
//! builds against.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes;
use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Finance Stack API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Payroll and financial ledger processing for school administration: \
                       tax rules, salary policies, payroll runs, ledger, invoices, budgets, \
                       and analytics.",
        license(name = "AGPL-3.0-or-later")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "employees", description = "Employee snapshot lookup"),
        (name = "tax", description = "Effective-dated tax rule registry"),
        (name = "payroll", description = "Pay periods, payroll runs, salary policies"),
        (name = "ledger", description = "Transaction log, balances, summaries"),
        (name = "invoices", description = "Invoice lifecycle and payments"),
        (name = "budgets", description = "Budget allocations and consumption"),
        (name = "analytics", description = "Derived dashboard statistics")
    ),
    components(schemas(
        routes::employees::CreateEmployeeRequest,
        routes::employees::EmployeeResponse,
        routes::tax::CreateRuleRequest,
        routes::tax::UpdateRateRequest,
        routes::tax::RuleResponse,
        routes::tax::SnapshotRateResponse,
        routes::payroll::SchedulePeriodsRequest,
        routes::payroll::SetCadenceRequest,
        routes::payroll::CreateRunRequest,
        routes::payroll::RejectRunRequest,
        routes::payroll::UpsertPolicyRequest,
        routes::payroll::AllowanceRequest,
        routes::payroll::PeriodResponse,
        routes::payroll::RunResponse,
        routes::payroll::SlipResponse,
        routes::payroll::PolicyResponse,
        routes::payroll::AllowanceResponse,
        routes::ledger::RecordTransactionRequest,
        routes::ledger::TransactionResponse,
        routes::ledger::ReferenceResponse,
        routes::ledger::SummaryResponse,
        routes::invoices::CreateInvoiceRequest,
        routes::invoices::RecordPaymentRequest,
        routes::invoices::InvoiceResponse,
        routes::budgets::CreateBudgetRequest,
        routes::budgets::BudgetResponse,
        routes::analytics::RoleStatsResponse,
        routes::analytics::TrendBucketResponse,
    ))
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates_and_serializes() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("Campus Finance Stack API"));
        assert!(json.contains("RunResponse"));
    }
}
