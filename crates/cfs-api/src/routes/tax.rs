//! # Tax Rule Routes
//!
//! Management surface for the effective-dated tax rule registry,
//! consumed by the payroll settings UI. Rates are decimal strings in
//! `[0, 1]` (`"0.1"` = 10%); updates are close-old-add-new, never
//! in-place edits.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use cfs_core::{money, TaxRuleId};
use cfs_tax::TaxRule;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::parse_date;
use crate::state::AppState;

/// Request to add a new tax rule.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRuleRequest {
    /// Tax name, e.g. `"Income"`.
    pub name: String,
    /// Decimal rate in `[0, 1]`, e.g. `"0.1"`.
    pub rate: String,
    /// First date the rate applies, `YYYY-MM-DD`.
    pub effective_from: String,
}

impl Validate for CreateRuleRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.name.len() > 100 {
            return Err("name must not exceed 100 characters".to_string());
        }
        money::parse_rate(&self.rate).map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Request to change a rate from a given date onward.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRateRequest {
    /// New decimal rate in `[0, 1]`.
    pub rate: String,
    /// First date the new rate applies, `YYYY-MM-DD`.
    pub effective_from: String,
}

impl Validate for UpdateRateRequest {
    fn validate(&self) -> Result<(), String> {
        money::parse_rate(&self.rate).map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// One tax rule version.
#[derive(Debug, Serialize, ToSchema)]
pub struct RuleResponse {
    /// Rule version id.
    pub id: Uuid,
    /// Tax name.
    pub name: String,
    /// Decimal rate with four fractional digits.
    pub rate: String,
    /// First date (inclusive) the rate applies.
    pub effective_from: String,
    /// First date (exclusive) it no longer applies, if closed.
    pub effective_to: Option<String>,
    /// Whether a finalized payroll run references this version.
    pub referenced: bool,
}

impl RuleResponse {
    fn from_rule(rule: &TaxRule, referenced: bool) -> Self {
        Self {
            id: *rule.id.as_uuid(),
            name: rule.name.clone(),
            rate: money::format_rate_bps(rule.rate_bps),
            effective_from: rule.effective_from.to_string(),
            effective_to: rule.effective_to.map(|d| d.to_string()),
            referenced,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    /// Date to pin, `YYYY-MM-DD`.
    pub as_of: String,
}

/// One pinned rate in a snapshot response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotRateResponse {
    /// Tax name.
    pub name: String,
    /// Rule version id the rate came from.
    pub rule_id: Uuid,
    /// Decimal rate.
    pub rate: String,
}

/// Routes under `/api/v1/tax`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/tax/rules", get(list_rules).post(create_rule))
        // PUT addresses a rule by name, DELETE by version id.
        .route(
            "/api/v1/tax/rules/{ident}",
            axum::routing::put(update_rate).delete(delete_rule),
        )
        .route("/api/v1/tax/snapshot", get(snapshot))
}

async fn list_rules(State(state): State<AppState>) -> Json<Vec<RuleResponse>> {
    let registry = state.tax.read();
    let rules = registry
        .list_rules()
        .into_iter()
        .map(|rule| RuleResponse::from_rule(rule, registry.is_referenced(rule.id)))
        .collect();
    Json(rules)
}

async fn create_rule(
    State(state): State<AppState>,
    body: Result<Json<CreateRuleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RuleResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let rate_bps = money::parse_rate(&req.rate)?;
    let effective_from = parse_date("effective_from", &req.effective_from)?;

    let mut registry = state.tax.write();
    let id = registry.add_rule(req.name, rate_bps, effective_from)?;
    let rule = registry
        .get(id)
        .ok_or_else(|| AppError::Internal("rule vanished after insert".to_string()))?;
    tracing::info!(rule_id = %id, name = %rule.name, "tax rule added");
    Ok((StatusCode::CREATED, Json(RuleResponse::from_rule(rule, false))))
}

async fn update_rate(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<UpdateRateRequest>, JsonRejection>,
) -> Result<Json<RuleResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let rate_bps = money::parse_rate(&req.rate)?;
    let effective_from = parse_date("effective_from", &req.effective_from)?;

    let mut registry = state.tax.write();
    let id = registry.update_rate(&name, rate_bps, effective_from)?;
    let rule = registry
        .get(id)
        .ok_or_else(|| AppError::Internal("rule vanished after update".to_string()))?;
    tracing::info!(rule_id = %id, name = %name, "tax rate updated");
    Ok(Json(RuleResponse::from_rule(rule, false)))
}

async fn delete_rule(
    State(state): State<AppState>,
    Path(ident): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = Uuid::parse_str(&ident)
        .map_err(|_| AppError::BadRequest(format!("{ident:?} is not a rule id")))?;
    state.tax.write().delete_rule(TaxRuleId::from_uuid(id))?;
    tracing::info!(rule_id = %id, "tax rule deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn snapshot(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<Vec<SnapshotRateResponse>>, AppError> {
    let as_of = parse_date("as_of", &query.as_of)?;
    let snapshot = state.tax.read().snapshot_at(as_of);
    let rates = snapshot
        .rates()
        .map(|(name, rate)| SnapshotRateResponse {
            name: name.to_string(),
            rule_id: *rate.rule_id.as_uuid(),
            rate: money::format_rate_bps(rate.rate_bps),
        })
        .collect();
    Ok(Json(rates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        router().with_state(AppState::new())
    }

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
    async fn create_and_list_rules() {
        let state = AppState::new();
        let app = router().with_state(state);

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/v1/tax/rules",
            Some(serde_json::json!({
                "name": "Income",
                "rate": "0.1",
                "effective_from": "2024-01-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["rate"], "0.1000");
        assert_eq!(body["effective_to"], serde_json::Value::Null);

        let (status, body) = send(app, "GET", "/api/v1/tax/rules", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn overlapping_rule_returns_conflict() {
        let state = AppState::new();
        let app = router().with_state(state);
        let body = serde_json::json!({
            "name": "Income", "rate": "0.1", "effective_from": "2024-01-01"
        });

        let (status, _) = send(app.clone(), "POST", "/api/v1/tax/rules", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, err) = send(app, "POST", "/api/v1/tax/rules", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn bad_rate_is_rejected_as_validation_error() {
        let (status, err) = send(
            app(),
            "POST",
            "/api/v1/tax/rules",
            Some(serde_json::json!({
                "name": "Income", "rate": "1.5", "effective_from": "2024-01-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"]["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn update_rate_splits_the_timeline() {
        let state = AppState::new();
        let app = router().with_state(state);
        send(
            app.clone(),
            "POST",
            "/api/v1/tax/rules",
            Some(serde_json::json!({
                "name": "Income", "rate": "0.1", "effective_from": "2024-01-01"
            })),
        )
        .await;

        let (status, body) = send(
            app.clone(),
            "PUT",
            "/api/v1/tax/rules/Income",
            Some(serde_json::json!({ "rate": "0.15", "effective_from": "2024-07-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rate"], "0.1500");

        // Snapshot before the change still sees the old rate.
        let (_, snap) = send(app, "GET", "/api/v1/tax/snapshot?as_of=2024-06-30", None).await;
        assert_eq!(snap[0]["rate"], "0.1000");
    }

    #[tokio::test]
    async fn delete_missing_rule_is_404() {
        let uri = format!("/api/v1/tax/rules/{}", Uuid::new_v4());
        let (status, _) = send(app(), "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
