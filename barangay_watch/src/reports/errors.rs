//! Report, audit and tip error types.

use thiserror::Error;

use super::models::ReportId;
use crate::auth::AuthError;

/// Errors from record operations
#[derive(Debug, Error)]
pub enum ReportError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No report with that ID
    #[error("Report {0} not found")]
    NotFound(ReportId),

    /// Blotter number already used by another report
    #[error("Blotter number '{0}' already exists")]
    DuplicateBlotter(String),

    /// A field failed validation
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Role policy denied the action
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl ReportError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ReportError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            ReportError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<AuthError> for ReportError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden(reason) => ReportError::Forbidden(reason),
            AuthError::Database(e) => ReportError::Database(e),
            other => ReportError::Forbidden(other.to_string()),
        }
    }
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;
