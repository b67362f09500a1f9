//! Request payload validation.
//!
//! Payloads implement [`Validate`] and are checked before a handler runs. A
//! rejected payload is reported with a [`ValidationReport`] and HTTP 422,
//! which is deliberately not an [`ApiResponse`](crate::response::ApiResponse)
//! envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FieldError {
    /// JSON pointer to the offending value, e.g. `/name`.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    match errors {
        [] => "Validation failed".to_string(),
        [first, ..] => format!("{}: {}", first.path, first.message),
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(path, message);
        errors
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Records an error unless `value` has between `min` and `max` characters.
    pub fn check_length(&mut self, path: &str, value: &str, min: usize, max: usize) {
        let length = value.chars().count();
        if length < min {
            self.push(
                path,
                format!("Expected string length greater or equal to {min}"),
            );
        } else if length > max {
            self.push(path, format!("Expected string length less or equal to {max}"));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Body of a 422 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidationReport {
    #[serde(rename = "type")]
    pub kind: String,
    pub on: String,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn body(errors: ValidationErrors) -> Self {
        Self {
            kind: "validation".to_string(),
            on: "body".to_string(),
            message: errors.to_string(),
            errors: errors.errors,
        }
    }
}

impl IntoResponse for ValidationReport {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).into_response()
    }
}
