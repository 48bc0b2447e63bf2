//! # Request Extraction & Validation
//!
//! Request DTOs implement [`Validate`] for the business-rule checks
//! serde cannot express (amount formats, date ordering, enum strings).
//! Handlers take `Result<Json<T>, JsonRejection>` and run it through
//! [`extract_validated_json`]: deserialization failures become 400,
//! validation failures 422.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Business-rule validation beyond what deserialization checks.
pub trait Validate {
    /// Returns an error message describing the first violated rule.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping deserialization errors to
/// [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(value)| value)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Unwrap and validate a JSON body.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
