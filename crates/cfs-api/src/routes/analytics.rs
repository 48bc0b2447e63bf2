//! # Analytics Routes
//!
//! Dashboard reads over payroll and ledger history. Every figure is
//! derived at request time from the authoritative records.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use cfs_core::money;

use crate::error::AppError;
use crate::routes::parse_opt_timestamp;
use crate::state::AppState;

/// Per-role salary statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleStatsResponse {
    /// Number of slips contributing.
    pub slip_count: u64,
    /// Sum of net pay, as a decimal string.
    pub total_net: String,
    /// Mean net pay per slip, as a decimal string.
    pub average_net: String,
}

/// One month of income/expense totals.
#[derive(Debug, Serialize, ToSchema)]
pub struct TrendBucketResponse {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1–12.
    pub month: u32,
    /// Money in, as a decimal string.
    pub income: String,
    /// Money out (magnitude), as a decimal string.
    pub expense: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// Range start, RFC 3339 (inclusive).
    pub from: Option<String>,
    /// Range end, RFC 3339 (inclusive).
    pub to: Option<String>,
}

/// Routes under `/api/v1/analytics`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/analytics/salary-by-role", get(salary_by_role))
        .route("/api/v1/analytics/trend", get(trend))
        .route("/api/v1/analytics/tax-totals", get(tax_totals))
}

async fn salary_by_role(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, RoleStatsResponse>>, AppError> {
    let from = parse_opt_timestamp("from", &query.from)?;
    let to = parse_opt_timestamp("to", &query.to)?;
    let employees = state.employees.list();

    let payroll = state.payroll.read();
    let stats = cfs_analytics::average_net_by_role(payroll.list_runs(None), &employees, from, to);
    Ok(Json(
        stats
            .into_iter()
            .map(|(role, s)| {
                (
                    role,
                    RoleStatsResponse {
                        slip_count: s.slip_count,
                        total_net: money::format_amount(s.total_net_cents),
                        average_net: money::format_amount(s.average_net_cents),
                    },
                )
            })
            .collect(),
    ))
}

async fn trend(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<TrendBucketResponse>>, AppError> {
    let from = parse_opt_timestamp("from", &query.from)?;
    let to = parse_opt_timestamp("to", &query.to)?;
    let finance = state.finance.read();
    Ok(Json(
        cfs_analytics::monthly_trend(&finance.ledger, from, to)
            .into_iter()
            .map(|bucket| TrendBucketResponse {
                year: bucket.year,
                month: bucket.month,
                income: money::format_amount(bucket.income_cents),
                expense: money::format_amount(bucket.expense_cents),
            })
            .collect(),
    ))
}

async fn tax_totals(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, String>>, AppError> {
    let from = parse_opt_timestamp("from", &query.from)?;
    let to = parse_opt_timestamp("to", &query.to)?;
    let payroll = state.payroll.read();
    Ok(Json(
        cfs_analytics::tax_totals(payroll.list_runs(None), from, to)
            .into_iter()
            .map(|(name, cents)| (name, money::format_amount(cents)))
            .collect(),
    ))
}
