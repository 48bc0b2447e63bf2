//! # Route Modules
//!
//! One module per resource, each exposing a `router()` assembled in
//! [`crate::app`]. Request DTOs validate through
//! [`crate::extractors::Validate`]; amounts cross the boundary as
//! decimal strings, dates as `YYYY-MM-DD`, instants as RFC 3339.

pub mod analytics;
pub mod budgets;
pub mod employees;
pub mod invoices;
pub mod ledger;
pub mod payroll;
pub mod tax;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::AppError;

/// Parse a `YYYY-MM-DD` date, mapping failures to a validation error.
pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    value
        .parse()
        .map_err(|_| AppError::Validation(format!("{field} must be a YYYY-MM-DD date, got {value:?}")))
}

/// Parse an RFC 3339 timestamp, mapping failures to a validation error.
pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            AppError::Validation(format!(
                "{field} must be an RFC 3339 timestamp, got {value:?}"
            ))
        })
}

/// Parse an optional RFC 3339 timestamp query parameter.
pub(crate) fn parse_opt_timestamp(
    field: &str,
    value: &Option<String>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    value
        .as_deref()
        .map(|v| parse_timestamp(field, v))
        .transpose()
}
