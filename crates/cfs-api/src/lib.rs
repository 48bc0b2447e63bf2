//! # cfs-api — HTTP Surface of the Campus Finance Stack
//!
//! Axum application exposing payroll and ledger processing to the
//! school administration UI.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                  | Domain                     |
//! |-------------------------|-------------------------|----------------------------|
//! | `/api/v1/employees/*`   | [`routes::employees`]   | Employee snapshots         |
//! | `/api/v1/tax/*`         | [`routes::tax`]         | Tax rule registry          |
//! | `/api/v1/payroll/*`     | [`routes::payroll`]     | Periods, runs, policies    |
//! | `/api/v1/ledger/*`      | [`routes::ledger`]      | Transaction log & balances |
//! | `/api/v1/invoices/*`    | [`routes::invoices`]    | Invoice lifecycle          |
//! | `/api/v1/budgets/*`     | [`routes::budgets`]     | Budget allocations         |
//! | `/api/v1/analytics/*`   | [`routes::analytics`]   | Dashboard statistics       |
//!
//! Health probes live at `/health/liveness` and `/health/readiness`;
//! the OpenAPI spec at `/openapi.json`.
//!
//! ## Boundary conventions
//!
//! Money crosses as decimal strings with two fractional digits, rates
//! as decimal strings in `[0, 1]`, dates as `YYYY-MM-DD`, instants as
//! RFC 3339. Internally everything is integer cents and basis points.

pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::employees::router())
        .merge(routes::tax::router())
        .merge(routes::payroll::router())
        .merge(routes::ledger::router())
        .merge(routes::invoices::router())
        .merge(routes::budgets::router())
        .merge(routes::analytics::router())
        .merge(openapi::router())
        // 1 MiB request body cap; every payload here is small JSON.
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(api)
        .with_state(state)
}

/// Liveness probe — 200 whenever the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Checks that the domain locks are acquirable, the ledger's cached
/// balance agrees with its log, and the database answers (when
/// configured). Returns 200 "ready" or 503 with a diagnostic.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    {
        let Some(finance) = state.finance.try_read() else {
            return (StatusCode::SERVICE_UNAVAILABLE, "finance lock held").into_response();
        };
        if let Err(e) = finance.ledger.verify_balance() {
            tracing::error!("readiness: ledger inconsistent: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "ledger inconsistent").into_response();
        }
        if state.payroll.try_read().is_none() {
            return (StatusCode::SERVICE_UNAVAILABLE, "payroll lock held").into_response();
        }
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("readiness: database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(
        app: &Router,
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
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_probes_respond() {
        let app = app(AppState::new());
        let (status, _) = send(&app, "GET", "/health/liveness", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", "/health/readiness", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_spec_is_served() {
        let app = app(AppState::new());
        let (status, spec) = send(&app, "GET", "/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(spec["info"]["title"]
            .as_str()
            .unwrap()
            .contains("Campus Finance"));
    }

    /// End-to-end: seed masters, run a payroll month, collect an
    /// invoice, and check the books reconcile.
    #[tokio::test]
    async fn month_end_flow_reconciles() {
        let app = app(AppState::new());

        // Masters: one Teacher, a policy, a 10% income tax.
        send(
            &app,
            "POST",
            "/api/v1/employees",
            Some(serde_json::json!({"role": "Teacher", "hire_date": "2023-09-01"})),
        )
        .await;
        send(
            &app,
            "POST",
            "/api/v1/payroll/policies",
            Some(serde_json::json!({
                "role": "Teacher", "base_salary": "1000.00", "currency": "USD"
            })),
        )
        .await;
        send(
            &app,
            "POST",
            "/api/v1/tax/rules",
            Some(serde_json::json!({
                "name": "Income", "rate": "0.1", "effective_from": "2024-01-01"
            })),
        )
        .await;

        // Tuition income: 2000.00 via an issued invoice, fully paid.
        let (_, invoice) = send(
            &app,
            "POST",
            "/api/v1/invoices",
            Some(serde_json::json!({"amount_due": "2000.00"})),
        )
        .await;
        let invoice_id = invoice["id"].as_str().unwrap().to_string();
        send(
            &app,
            "POST",
            &format!("/api/v1/invoices/{invoice_id}/issue"),
            None,
        )
        .await;
        let (_, invoice) = send(
            &app,
            "POST",
            &format!("/api/v1/invoices/{invoice_id}/payments"),
            Some(serde_json::json!({"amount": "2000.00"})),
        )
        .await;
        assert_eq!(invoice["status"], "PAID");

        // Payroll: schedule January, run it automatically, disburse.
        let (_, periods) = send(
            &app,
            "POST",
            "/api/v1/payroll/periods/schedule",
            Some(serde_json::json!({"as_of": "2024-01-01"})),
        )
        .await;
        let (_, run) = send(
            &app,
            "POST",
            "/api/v1/payroll/runs",
            Some(serde_json::json!({
                "period_id": periods[0]["id"], "approval_mode": "AUTOMATIC"
            })),
        )
        .await;
        let run_id = run["id"].as_str().unwrap().to_string();
        let (_, run) = send(
            &app,
            "POST",
            &format!("/api/v1/payroll/runs/{run_id}/compute"),
            None,
        )
        .await;
        assert_eq!(run["status"], "APPROVED");
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/payroll/runs/{run_id}/disburse"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Books: 2000.00 in, 900.00 out, balance 1100.00, verified.
        let (_, summary) = send(&app, "GET", "/api/v1/ledger/summary", None).await;
        assert_eq!(summary["income"], "2000.00");
        assert_eq!(summary["expense"], "900.00");
        assert_eq!(summary["balance"], "1100.00");
        let (status, _) = send(&app, "GET", "/api/v1/ledger/verify", None).await;
        assert_eq!(status, StatusCode::OK);

        // Analytics sees the disbursed run.
        let (_, stats) = send(&app, "GET", "/api/v1/analytics/salary-by-role", None).await;
        assert_eq!(stats["Teacher"]["average_net"], "900.00");

        // The pinned tax rule is frozen against deletion.
        let (_, rules) = send(&app, "GET", "/api/v1/tax/rules", None).await;
        assert_eq!(rules[0]["referenced"], true);
        let rule_id = rules[0]["id"].as_str().unwrap();
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/v1/tax/rules/{rule_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
