//! # Employee Lookup Routes
//!
//! A thin stand-in for the external employee management system: the
//! payroll engine only needs `{id, role, hire_date, status}` snapshots,
//! seeded and read through these endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use cfs_core::EmployeeId;
use cfs_tax::{Employee, EmployeeStatus};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::parse_date;
use crate::state::AppState;

/// Request to seed an employee snapshot.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployeeRequest {
    /// Role used for salary policy lookup.
    pub role: String,
    /// First day of employment, `YYYY-MM-DD`.
    pub hire_date: String,
    /// `ACTIVE` (default) or `INACTIVE`.
    pub status: Option<String>,
}

impl Validate for CreateEmployeeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.role.trim().is_empty() {
            return Err("role must not be empty".to_string());
        }
        if self.role.len() > 100 {
            return Err("role must not exceed 100 characters".to_string());
        }
        if let Some(status) = &self.status {
            parse_status(status)?;
        }
        Ok(())
    }
}

fn parse_status(value: &str) -> Result<EmployeeStatus, String> {
    match value {
        "ACTIVE" => Ok(EmployeeStatus::Active),
        "INACTIVE" => Ok(EmployeeStatus::Inactive),
        other => Err(format!("status must be ACTIVE or INACTIVE, got {other:?}")),
    }
}

/// Employee snapshot representation.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmployeeResponse {
    /// Employee id.
    pub id: Uuid,
    /// Role.
    pub role: String,
    /// Hire date.
    pub hire_date: String,
    /// Employment status.
    pub status: String,
}

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        Self {
            id: *employee.id.as_uuid(),
            role: employee.role,
            hire_date: employee.hire_date.to_string(),
            status: match employee.status {
                EmployeeStatus::Active => "ACTIVE".to_string(),
                EmployeeStatus::Inactive => "INACTIVE".to_string(),
            },
        }
    }
}

/// Routes under `/api/v1/employees`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/employees", get(list_employees).post(create_employee))
        .route("/api/v1/employees/{id}", get(get_employee))
}

async fn create_employee(
    State(state): State<AppState>,
    body: Result<Json<CreateEmployeeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EmployeeResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let hire_date = parse_date("hire_date", &req.hire_date)?;
    let status = req
        .status
        .as_deref()
        .map(parse_status)
        .transpose()
        .map_err(AppError::Validation)?
        .unwrap_or(EmployeeStatus::Active);

    let employee = Employee {
        id: EmployeeId::new(),
        role: req.role,
        hire_date,
        status,
    };
    state.employees.insert(*employee.id.as_uuid(), employee.clone());
    Ok((StatusCode::CREATED, Json(employee.into())))
}

async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EmployeeResponse>, AppError> {
    state
        .employees
        .get(&id)
        .map(|e| Json(e.into()))
        .ok_or_else(|| AppError::NotFound(format!("employee {id} not found")))
}

async fn list_employees(State(state): State<AppState>) -> Json<Vec<EmployeeResponse>> {
    let mut employees = state.employees.list();
    employees.sort_by_key(|e| e.id);
    Json(employees.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn create_then_lookup_roundtrip() {
        let app = router().with_state(AppState::new());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/employees")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"role": "Teacher", "hire_date": "2023-09-01"}).to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let created: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(created["status"], "ACTIVE");

        let uri = format!("/api/v1/employees/{}", created["id"].as_str().unwrap());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_status_is_rejected() {
        let app = router().with_state(AppState::new());
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/employees")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "role": "Teacher", "hire_date": "2023-09-01", "status": "RETIRED"
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
