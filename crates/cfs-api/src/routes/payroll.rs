//! # Payroll Routes
//!
//! Period scheduling, the run lifecycle (create → compute → approve →
//! disburse), and salary policy management.
//!
//! Compute pins the tax snapshot at the period's payday, so recomputing
//! a run after a rate change for a later date cannot alter its numbers.
//! Disbursement takes the payroll, finance, and tax locks in one
//! critical section; the committed batch is written through to the
//! database only after the in-memory commit.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use cfs_core::{money, PeriodId, RunId};
use cfs_payroll::{ApprovalMode, Cadence, PayPeriod, PaySlip, PayrollRun, RunStatus};
use cfs_tax::{Allowance, SalaryPolicy};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::parse_date;
use crate::state::AppState;

// -- Requests -----------------------------------------------------------------

/// Request to generate periods up to a date.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SchedulePeriodsRequest {
    /// Generate every period starting on or before this date.
    pub as_of: String,
}

impl Validate for SchedulePeriodsRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Request to change the payroll cadence.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetCadenceRequest {
    /// `MONTHLY` or `BI_WEEKLY`. Applies to periods generated from now
    /// on; existing periods keep their boundaries.
    pub cadence: String,
}

impl Validate for SetCadenceRequest {
    fn validate(&self) -> Result<(), String> {
        parse_cadence(&self.cadence)?;
        Ok(())
    }
}

/// Request to open a payroll run for a period.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRunRequest {
    /// Period to pay.
    pub period_id: Uuid,
    /// `AUTOMATIC` or `MANUAL`.
    pub approval_mode: String,
}

impl Validate for CreateRunRequest {
    fn validate(&self) -> Result<(), String> {
        parse_approval_mode(&self.approval_mode)?;
        Ok(())
    }
}

/// Request to reject a computed run.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectRunRequest {
    /// Recorded in the run's audit log.
    pub reason: String,
}

impl Validate for RejectRunRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to create or replace a role's salary policy.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertPolicyRequest {
    /// Role the policy covers.
    pub role: String,
    /// Base salary per period as a decimal string, e.g. `"1000.00"`.
    pub base_salary: String,
    /// ISO currency code.
    pub currency: String,
    /// Allowances added to the base.
    #[serde(default)]
    pub allowances: Vec<AllowanceRequest>,
}

/// One allowance line in a policy request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AllowanceRequest {
    /// Allowance label.
    pub name: String,
    /// Per-period amount as a decimal string.
    pub amount: String,
}

impl Validate for UpsertPolicyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.role.trim().is_empty() {
            return Err("role must not be empty".to_string());
        }
        if self.currency.len() != 3 {
            return Err("currency must be a 3-letter ISO code".to_string());
        }
        money::parse_amount(&self.base_salary).map_err(|e| e.to_string())?;
        for allowance in &self.allowances {
            if allowance.name.trim().is_empty() {
                return Err("allowance name must not be empty".to_string());
            }
            money::parse_amount(&allowance.amount).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

fn parse_cadence(value: &str) -> Result<Cadence, String> {
    match value {
        "MONTHLY" => Ok(Cadence::Monthly),
        "BI_WEEKLY" => Ok(Cadence::BiWeekly),
        other => Err(format!("cadence must be MONTHLY or BI_WEEKLY, got {other:?}")),
    }
}

fn parse_approval_mode(value: &str) -> Result<ApprovalMode, String> {
    match value {
        "AUTOMATIC" => Ok(ApprovalMode::Automatic),
        "MANUAL" => Ok(ApprovalMode::Manual),
        other => Err(format!(
            "approval_mode must be AUTOMATIC or MANUAL, got {other:?}"
        )),
    }
}

fn parse_run_status(value: &str) -> Result<RunStatus, AppError> {
    match value {
        "DRAFT" => Ok(RunStatus::Draft),
        "PENDING_APPROVAL" => Ok(RunStatus::PendingApproval),
        "APPROVED" => Ok(RunStatus::Approved),
        "REJECTED" => Ok(RunStatus::Rejected),
        "DISBURSED" => Ok(RunStatus::Disbursed),
        other => Err(AppError::Validation(format!(
            "unknown run status {other:?}"
        ))),
    }
}

// -- Responses ----------------------------------------------------------------

/// One pay period.
#[derive(Debug, Serialize, ToSchema)]
pub struct PeriodResponse {
    /// Period id.
    pub id: Uuid,
    /// First day (inclusive).
    pub start_date: String,
    /// Last day (inclusive).
    pub end_date: String,
    /// Payday; tax snapshots pin here.
    pub payday: String,
    /// Lifecycle status.
    pub status: String,
}

impl From<&PayPeriod> for PeriodResponse {
    fn from(period: &PayPeriod) -> Self {
        Self {
            id: *period.id.as_uuid(),
            start_date: period.start_date.to_string(),
            end_date: period.end_date.to_string(),
            payday: period.payday.to_string(),
            status: period.status.as_str().to_string(),
        }
    }
}

/// One payroll run with its totals.
#[derive(Debug, Serialize, ToSchema)]
pub struct RunResponse {
    /// Run id.
    pub id: Uuid,
    /// The period the run pays.
    pub period_id: Uuid,
    /// Lifecycle status.
    pub status: String,
    /// Approval mode fixed at creation.
    pub approval_mode: String,
    /// Creation instant, RFC 3339.
    pub created_at: String,
    /// Number of computed slips.
    pub slip_count: usize,
    /// Total gross as a decimal string.
    pub total_gross: String,
    /// Total withheld tax as a decimal string.
    pub total_tax: String,
    /// Total net (the disbursement amount) as a decimal string.
    pub total_net: String,
}

impl RunResponse {
    fn from_run(run: &PayrollRun) -> Result<Self, AppError> {
        Ok(Self {
            id: *run.id.as_uuid(),
            period_id: *run.period_id.as_uuid(),
            status: run.status.as_str().to_string(),
            approval_mode: match run.approval_mode {
                ApprovalMode::Automatic => "AUTOMATIC".to_string(),
                ApprovalMode::Manual => "MANUAL".to_string(),
            },
            created_at: run.created_at.to_rfc3339(),
            slip_count: run.slips.len(),
            total_gross: money::format_amount(run.total_gross_cents()?),
            total_tax: money::format_amount(run.total_tax_cents()?),
            total_net: money::format_amount(run.total_net_cents()?),
        })
    }
}

/// One pay slip.
#[derive(Debug, Serialize, ToSchema)]
pub struct SlipResponse {
    /// The employee paid.
    pub employee_id: Uuid,
    /// Gross pay as a decimal string.
    pub gross: String,
    /// Withheld amount per tax name.
    pub tax_breakdown: BTreeMap<String, String>,
    /// Net pay as a decimal string.
    pub net: String,
}

impl From<&PaySlip> for SlipResponse {
    fn from(slip: &PaySlip) -> Self {
        Self {
            employee_id: *slip.employee_id.as_uuid(),
            gross: money::format_amount(slip.gross_cents),
            tax_breakdown: slip
                .tax_breakdown
                .iter()
                .map(|(name, cents)| (name.clone(), money::format_amount(*cents)))
                .collect(),
            net: money::format_amount(slip.net_cents),
        }
    }
}

/// A role's salary policy.
#[derive(Debug, Serialize, ToSchema)]
pub struct PolicyResponse {
    /// Role.
    pub role: String,
    /// Base salary as a decimal string.
    pub base_salary: String,
    /// ISO currency code.
    pub currency: String,
    /// Allowance lines.
    pub allowances: Vec<AllowanceResponse>,
}

/// One allowance line in a policy response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AllowanceResponse {
    /// Allowance label.
    pub name: String,
    /// Per-period amount as a decimal string.
    pub amount: String,
}

impl From<&SalaryPolicy> for PolicyResponse {
    fn from(policy: &SalaryPolicy) -> Self {
        Self {
            role: policy.role.clone(),
            base_salary: money::format_amount(policy.base_cents),
            currency: policy.currency.clone(),
            allowances: policy
                .allowances
                .iter()
                .map(|a| AllowanceResponse {
                    name: a.name.clone(),
                    amount: money::format_amount(a.amount_cents),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    /// Reference date, `YYYY-MM-DD`.
    pub as_of: String,
}

#[derive(Debug, Deserialize)]
pub struct RunListQuery {
    /// Filter by run status.
    pub status: Option<String>,
}

// -- Router -------------------------------------------------------------------

/// Routes under `/api/v1/payroll`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/payroll/periods", get(list_periods))
        .route("/api/v1/payroll/periods/schedule", post(schedule_periods))
        .route("/api/v1/payroll/periods/due", get(due_periods))
        .route("/api/v1/payroll/periods/{id}/cancel", post(cancel_period))
        .route("/api/v1/payroll/cadence", put(set_cadence))
        .route("/api/v1/payroll/runs", get(list_runs).post(create_run))
        .route("/api/v1/payroll/runs/{id}", get(get_run))
        .route("/api/v1/payroll/runs/{id}/slips", get(get_slips))
        .route("/api/v1/payroll/runs/{id}/compute", post(compute_run))
        .route("/api/v1/payroll/runs/{id}/approve", post(approve_run))
        .route("/api/v1/payroll/runs/{id}/reject", post(reject_run))
        .route("/api/v1/payroll/runs/{id}/disburse", post(disburse_run))
        .route(
            "/api/v1/payroll/policies",
            get(list_policies).post(upsert_policy),
        )
}

// -- Period handlers ----------------------------------------------------------

async fn schedule_periods(
    State(state): State<AppState>,
    body: Result<Json<SchedulePeriodsRequest>, JsonRejection>,
) -> Result<Json<Vec<PeriodResponse>>, AppError> {
    let req = extract_validated_json(body)?;
    let as_of = parse_date("as_of", &req.as_of)?;

    let mut payroll = state.payroll.write();
    let created = payroll.scheduler.schedule_through(as_of);
    tracing::info!(count = created.len(), %as_of, "periods scheduled");
    let periods = created
        .into_iter()
        .filter_map(|id| payroll.scheduler.get(id))
        .map(PeriodResponse::from)
        .collect();
    Ok(Json(periods))
}

async fn list_periods(State(state): State<AppState>) -> Json<Vec<PeriodResponse>> {
    let payroll = state.payroll.read();
    Json(
        payroll
            .scheduler
            .list()
            .into_iter()
            .map(PeriodResponse::from)
            .collect(),
    )
}

async fn due_periods(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<Vec<PeriodResponse>>, AppError> {
    let as_of = parse_date("as_of", &query.as_of)?;
    let payroll = state.payroll.read();
    Ok(Json(
        payroll
            .scheduler
            .next_due_periods(as_of)
            .into_iter()
            .map(PeriodResponse::from)
            .collect(),
    ))
}

async fn cancel_period(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let period_id = PeriodId::from_uuid(id);
    state.payroll.write().scheduler.cancel(period_id)?;
    tracing::info!(%period_id, "period cancelled");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_cadence(
    State(state): State<AppState>,
    body: Result<Json<SetCadenceRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let req = extract_validated_json(body)?;
    let cadence = parse_cadence(&req.cadence).map_err(AppError::Validation)?;
    state.payroll.write().scheduler.set_cadence(cadence);
    tracing::info!(cadence = %req.cadence, "payroll cadence changed");
    Ok(StatusCode::NO_CONTENT)
}

// -- Run handlers -------------------------------------------------------------

async fn create_run(
    State(state): State<AppState>,
    body: Result<Json<CreateRunRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RunResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let mode = parse_approval_mode(&req.approval_mode).map_err(AppError::Validation)?;
    let period_id = PeriodId::from_uuid(req.period_id);

    let mut payroll = state.payroll.write();
    let run_id = payroll.create_run(period_id, mode, Utc::now())?;
    tracing::info!(%run_id, %period_id, "payroll run created");
    let run = payroll
        .get_run(run_id)
        .ok_or_else(|| AppError::Internal("run vanished after insert".to_string()))?;
    Ok((StatusCode::CREATED, Json(RunResponse::from_run(run)?)))
}

async fn compute_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunResponse>, AppError> {
    let run_id = RunId::from_uuid(id);

    // Pin the tax snapshot at the period's payday.
    let payday = {
        let payroll = state.payroll.read();
        let run = payroll
            .get_run(run_id)
            .ok_or_else(|| AppError::NotFound(format!("run {run_id} not found")))?;
        payroll
            .scheduler
            .get(run.period_id)
            .ok_or_else(|| AppError::Internal(format!("period missing for run {run_id}")))?
            .payday
    };
    let snapshot = state.tax.read().snapshot_at(payday);
    let employees = state.employees.list();
    let policies = state.policies.read().clone();

    let mut payroll = state.payroll.write();
    let count = payroll.compute(run_id, &employees, &policies, &snapshot, Utc::now())?;
    tracing::info!(%run_id, slips = count, %payday, "payroll run computed");
    let run = payroll
        .get_run(run_id)
        .ok_or_else(|| AppError::Internal("run vanished after compute".to_string()))?;
    Ok(Json(RunResponse::from_run(run)?))
}

async fn approve_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunResponse>, AppError> {
    let run_id = RunId::from_uuid(id);
    let mut payroll = state.payroll.write();
    payroll.approve(run_id, Utc::now())?;
    tracing::info!(%run_id, "payroll run approved");
    let run = payroll
        .get_run(run_id)
        .ok_or_else(|| AppError::Internal("run vanished after approve".to_string()))?;
    Ok(Json(RunResponse::from_run(run)?))
}

async fn reject_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<RejectRunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let run_id = RunId::from_uuid(id);
    let mut payroll = state.payroll.write();
    payroll.reject(run_id, req.reason, Utc::now())?;
    tracing::info!(%run_id, "payroll run rejected");
    let run = payroll
        .get_run(run_id)
        .ok_or_else(|| AppError::Internal("run vanished after reject".to_string()))?;
    Ok(Json(RunResponse::from_run(run)?))
}

async fn disburse_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunResponse>, AppError> {
    let run_id = RunId::from_uuid(id);

    // Lock order: payroll, finance, tax. All three mutate in one
    // critical section; the locks drop before the database write.
    let (committed, response) = {
        let mut payroll = state.payroll.write();
        let mut finance = state.finance.write();
        let mut tax = state.tax.write();
        let committed = payroll.disburse(run_id, &mut finance.ledger, &mut tax, Utc::now())?;
        let run = payroll
            .get_run(run_id)
            .ok_or_else(|| AppError::Internal("run vanished after disburse".to_string()))?;
        (committed, RunResponse::from_run(run)?)
    };
    tracing::info!(%run_id, transactions = committed.len(), "payroll run disbursed");

    if let Some(pool) = &state.db_pool {
        crate::db::transactions::insert_batch(pool, &committed).await?;
    }
    Ok(Json(response))
}

async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunResponse>, AppError> {
    let run_id = RunId::from_uuid(id);
    let payroll = state.payroll.read();
    let run = payroll
        .get_run(run_id)
        .ok_or_else(|| AppError::NotFound(format!("run {run_id} not found")))?;
    Ok(Json(RunResponse::from_run(run)?))
}

async fn get_slips(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SlipResponse>>, AppError> {
    let run_id = RunId::from_uuid(id);
    let payroll = state.payroll.read();
    let slips = payroll.slips(run_id)?;
    Ok(Json(slips.iter().map(SlipResponse::from).collect()))
}

async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunListQuery>,
) -> Result<Json<Vec<RunResponse>>, AppError> {
    let status = query
        .status
        .as_deref()
        .map(parse_run_status)
        .transpose()?;
    let payroll = state.payroll.read();
    payroll
        .list_runs(status)
        .into_iter()
        .map(RunResponse::from_run)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

// -- Policy handlers ----------------------------------------------------------

async fn upsert_policy(
    State(state): State<AppState>,
    body: Result<Json<UpsertPolicyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PolicyResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let base_cents = money::parse_amount(&req.base_salary)?;
    let allowances = req
        .allowances
        .iter()
        .map(|a| {
            Ok(Allowance {
                name: a.name.clone(),
                amount_cents: money::parse_amount(&a.amount)?,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let policy = SalaryPolicy {
        role: req.role,
        base_cents,
        currency: req.currency,
        allowances,
    };
    let response = PolicyResponse::from(&policy);
    tracing::info!(role = %policy.role, "salary policy upserted");
    state.policies.write().upsert(policy);
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_policies(State(state): State<AppState>) -> Json<Vec<PolicyResponse>> {
    let policies = state.policies.read();
    Json(policies.list().map(PolicyResponse::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use cfs_core::EmployeeId;
    use cfs_tax::{Employee, EmployeeStatus};

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

    /// State seeded with one Teacher at 1000.00, a 10% Income tax, and
    /// the scheduler anchored at 2024-01-01.
    fn seeded_state() -> AppState {
        let state = AppState::new();
        let employee = Employee {
            id: EmployeeId::new(),
            role: "Teacher".to_string(),
            hire_date: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
            status: EmployeeStatus::Active,
        };
        state.employees.insert(*employee.id.as_uuid(), employee);
        state.policies.write().upsert(SalaryPolicy {
            role: "Teacher".to_string(),
            base_cents: 100_000,
            currency: "USD".to_string(),
            allowances: vec![],
        });
        state
            .tax
            .write()
            .add_rule("Income", 1000, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        state
    }

    #[tokio::test]
    async fn full_run_lifecycle_over_http() {
        let state = seeded_state();
        let app = router().with_state(state.clone());

        // Schedule January.
        let (status, periods) = send(
            app.clone(),
            "POST",
            "/api/v1/payroll/periods/schedule",
            Some(serde_json::json!({"as_of": "2024-01-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let period_id = periods[0]["id"].as_str().unwrap().to_string();
        assert_eq!(periods[0]["payday"], "2024-01-31");

        // Create a manual run.
        let (status, run) = send(
            app.clone(),
            "POST",
            "/api/v1/payroll/runs",
            Some(serde_json::json!({"period_id": period_id, "approval_mode": "MANUAL"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(run["status"], "DRAFT");
        let run_id = run["id"].as_str().unwrap().to_string();

        // Compute: 1000.00 gross, 10% tax, 900.00 net.
        let (status, run) = send(
            app.clone(),
            "POST",
            &format!("/api/v1/payroll/runs/{run_id}/compute"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], "PENDING_APPROVAL");
        assert_eq!(run["total_gross"], "1000.00");
        assert_eq!(run["total_tax"], "100.00");
        assert_eq!(run["total_net"], "900.00");

        // Approve, then disburse.
        let (status, run) = send(
            app.clone(),
            "POST",
            &format!("/api/v1/payroll/runs/{run_id}/approve"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], "APPROVED");

        let (status, run) = send(
            app.clone(),
            "POST",
            &format!("/api/v1/payroll/runs/{run_id}/disburse"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], "DISBURSED");

        // The ledger carries one -900.00 disbursement.
        assert_eq!(state.finance.read().ledger.balance(), -90_000);

        // Slips are readable after disbursement.
        let (status, slips) = send(
            app,
            "GET",
            &format!("/api/v1/payroll/runs/{run_id}/slips"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(slips[0]["net"], "900.00");
        assert_eq!(slips[0]["tax_breakdown"]["Income"], "100.00");
    }

    #[tokio::test]
    async fn second_run_for_same_period_conflicts() {
        let state = seeded_state();
        let app = router().with_state(state);

        let (_, periods) = send(
            app.clone(),
            "POST",
            "/api/v1/payroll/periods/schedule",
            Some(serde_json::json!({"as_of": "2024-01-01"})),
        )
        .await;
        let body = serde_json::json!({
            "period_id": periods[0]["id"], "approval_mode": "MANUAL"
        });

        let (status, _) = send(app.clone(), "POST", "/api/v1/payroll/runs", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, err) = send(app, "POST", "/api/v1/payroll/runs", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn disburse_before_approval_conflicts() {
        let state = seeded_state();
        let app = router().with_state(state);

        let (_, periods) = send(
            app.clone(),
            "POST",
            "/api/v1/payroll/periods/schedule",
            Some(serde_json::json!({"as_of": "2024-01-01"})),
        )
        .await;
        let (_, run) = send(
            app.clone(),
            "POST",
            "/api/v1/payroll/runs",
            Some(serde_json::json!({
                "period_id": periods[0]["id"], "approval_mode": "MANUAL"
            })),
        )
        .await;
        let run_id = run["id"].as_str().unwrap();

        let (status, _) = send(
            app,
            "POST",
            &format!("/api/v1/payroll/runs/{run_id}/disburse"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn due_periods_reports_backlog() {
        let app = router().with_state(seeded_state());
        send(
            app.clone(),
            "POST",
            "/api/v1/payroll/periods/schedule",
            Some(serde_json::json!({"as_of": "2024-03-01"})),
        )
        .await;

        let (status, due) = send(
            app,
            "GET",
            "/api/v1/payroll/periods/due?as_of=2024-03-31",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(due.as_array().unwrap().len(), 3);
        assert_eq!(due[0]["start_date"], "2024-01-01");
    }

    #[tokio::test]
    async fn policy_upsert_and_list() {
        let app = router().with_state(AppState::new());
        let (status, policy) = send(
            app.clone(),
            "POST",
            "/api/v1/payroll/policies",
            Some(serde_json::json!({
                "role": "Librarian",
                "base_salary": "850.50",
                "currency": "USD",
                "allowances": [{"name": "Books", "amount": "25.00"}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(policy["base_salary"], "850.50");

        let (_, list) = send(app, "GET", "/api/v1/payroll/policies", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["allowances"][0]["amount"], "25.00");
    }
}
