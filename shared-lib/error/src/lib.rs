//! Common error types for attendance services.
//!
//! This crate provides unified error handling across all services.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Storage-related errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<StoreError> for ErrorResponse {
    fn from(err: StoreError) -> Self {
        let (code, message) = match &err {
            StoreError::NotFound => ("STORE_NOT_FOUND", "Record not found"),
            StoreError::DuplicateEntry(_) => ("STORE_DUPLICATE_ENTRY", "Duplicate entry"),
            StoreError::WriteConflict(_) => ("STORE_WRITE_CONFLICT", "Write conflict"),
            StoreError::Unavailable(_) => ("STORE_UNAVAILABLE", "Store unavailable"),
        };
        Self::new(code, message).with_details(err.to_string())
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Store(store) => store.into(),
            AppError::Validation(msg) => Self::new("VALIDATION", msg),
            AppError::NotFound(what) => Self::new("NOT_FOUND", format!("Not found: {what}")),
            AppError::Internal(msg) => Self::new("INTERNAL", msg),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_maps_to_stable_code() {
        let response: ErrorResponse = StoreError::WriteConflict("snapshot".to_string()).into();
        assert_eq!(response.code, "STORE_WRITE_CONFLICT");
        assert!(response.details.unwrap().contains("snapshot"));
    }

    #[test]
    fn validation_error_keeps_message() {
        let response: ErrorResponse = AppError::Validation("bad time".to_string()).into();
        assert_eq!(response.code, "VALIDATION");
        assert_eq!(response.message, "bad time");
    }

    #[test]
    fn error_response_serializes_without_empty_details() {
        let json = serde_json::to_string(&ErrorResponse::new("NOT_FOUND", "missing")).unwrap();
        assert!(!json.contains("details"));
    }
}
