//! # Budget Routes
//!
//! Budget allocations per category and period. Consumption and
//! remaining amounts are computed from the ledger on every read.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use cfs_core::{money, BudgetId};
use cfs_ledger::{Budget, Ledger};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::parse_date;
use crate::state::AppState;

/// Request to allocate a budget.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBudgetRequest {
    /// Expense category the budget covers.
    pub category: String,
    /// Allocated amount as a positive decimal string.
    pub allocated: String,
    /// First day of the budget period, `YYYY-MM-DD`.
    pub period_start: String,
    /// Last day of the budget period, `YYYY-MM-DD`.
    pub period_end: String,
}

impl Validate for CreateBudgetRequest {
    fn validate(&self) -> Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("category must not be empty".to_string());
        }
        let cents = money::parse_amount(&self.allocated).map_err(|e| e.to_string())?;
        if cents <= 0 {
            return Err("allocated must be positive".to_string());
        }
        Ok(())
    }
}

/// A budget with its derived consumption.
#[derive(Debug, Serialize, ToSchema)]
pub struct BudgetResponse {
    /// Budget id.
    pub id: Uuid,
    /// Category covered.
    pub category: String,
    /// Allocation as a decimal string.
    pub allocated: String,
    /// Expense total consumed so far, as a decimal string.
    pub consumed: String,
    /// Allocation minus consumption. Negative means overspent.
    pub remaining: String,
    /// First day of the period.
    pub period_start: String,
    /// Last day of the period.
    pub period_end: String,
}

impl BudgetResponse {
    fn from_budget(budget: &Budget, ledger: &Ledger) -> Self {
        Self {
            id: *budget.id.as_uuid(),
            category: budget.category.clone(),
            allocated: money::format_amount(budget.allocated_cents),
            consumed: money::format_amount(budget.consumed(ledger)),
            remaining: money::format_amount(budget.remaining(ledger)),
            period_start: budget.period_start.to_string(),
            period_end: budget.period_end.to_string(),
        }
    }
}

/// Routes under `/api/v1/budgets`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/budgets", get(list_budgets).post(create_budget))
        .route("/api/v1/budgets/{id}", get(get_budget))
}

async fn create_budget(
    State(state): State<AppState>,
    body: Result<Json<CreateBudgetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BudgetResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let allocated_cents = money::parse_amount(&req.allocated)?;
    let period_start = parse_date("period_start", &req.period_start)?;
    let period_end = parse_date("period_end", &req.period_end)?;
    if period_end < period_start {
        return Err(AppError::Validation(
            "period_end must not precede period_start".to_string(),
        ));
    }

    let mut finance = state.finance.write();
    let id = finance
        .budgets
        .create(req.category, allocated_cents, period_start, period_end);
    tracing::info!(budget_id = %id, allocated_cents, "budget created");
    let budget = finance.budgets.get(id)?;
    Ok((
        StatusCode::CREATED,
        Json(BudgetResponse::from_budget(budget, &finance.ledger)),
    ))
}

async fn get_budget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetResponse>, AppError> {
    let budget_id = BudgetId::from_uuid(id);
    let finance = state.finance.read();
    let budget = finance.budgets.get(budget_id)?;
    Ok(Json(BudgetResponse::from_budget(budget, &finance.ledger)))
}

async fn list_budgets(State(state): State<AppState>) -> Json<Vec<BudgetResponse>> {
    let finance = state.finance.read();
    Json(
        finance
            .budgets
            .list()
            .map(|budget| BudgetResponse::from_budget(budget, &finance.ledger))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use cfs_ledger::{TransactionDraft, TransactionType};

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
    async fn consumption_tracks_ledger_expenses() {
        let state = AppState::new();
        let app = router().with_state(state.clone());

        let (status, budget) = send(
            app.clone(),
            "POST",
            "/api/v1/budgets",
            Some(serde_json::json!({
                "category": "Supplies",
                "allocated": "500.00",
                "period_start": "2024-01-01",
                "period_end": "2024-12-31"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(budget["consumed"], "0.00");
        let id = budget["id"].as_str().unwrap().to_string();

        state
            .finance
            .write()
            .ledger
            .record(TransactionDraft {
                tx_type: TransactionType::Expense,
                amount_cents: -20_000,
                category: "Supplies".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                reference: None,
            })
            .unwrap();

        let (_, budget) = send(app, "GET", &format!("/api/v1/budgets/{id}"), None).await;
        assert_eq!(budget["consumed"], "200.00");
        assert_eq!(budget["remaining"], "300.00");
    }

    #[tokio::test]
    async fn inverted_period_is_rejected() {
        let app = router().with_state(AppState::new());
        let (status, _) = send(
            app,
            "POST",
            "/api/v1/budgets",
            Some(serde_json::json!({
                "category": "Supplies",
                "allocated": "500.00",
                "period_start": "2024-06-01",
                "period_end": "2024-01-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_budget_is_404() {
        let app = router().with_state(AppState::new());
        let uri = format!("/api/v1/budgets/{}", Uuid::new_v4());
        let (status, _) = send(app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
