use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the solve service on non-2xx responses.
///
/// `detail` is a plain string for solver failures and a list of field
/// errors for request validation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: serde_json::Value::String(detail.into()),
        }
    }

    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{field} must be a finite number greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must not be empty")]
    EmptyExpression { field: &'static str },
}
