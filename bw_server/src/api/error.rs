//! HTTP error responses.
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}` with a
//! status derived from the library error.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use barangay_watch::{auth::AuthError, reports::ReportError, settings::SettingsError};
use serde_json::json;

/// Error returned by every handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Request body could not be read into the expected shape
    #[error("{0}")]
    InvalidBody(String),
}

impl ApiError {
    /// HTTP status and stable machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Auth(err) => match err {
                AuthError::Database(_) | AuthError::HashingFailed => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
                AuthError::InvalidPassword | AuthError::UserNotFound => {
                    (StatusCode::BAD_REQUEST, "INVALID_CREDENTIALS")
                }
                AuthError::UsernameTaken => (StatusCode::CONFLICT, "DUPLICATE_USERNAME"),
                AuthError::InvalidUsername(_) | AuthError::WeakPassword(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                }
                AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
                AuthError::Unauthenticated | AuthError::StaleSession => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED")
                }
                AuthError::ChallengeNotFound => (StatusCode::BAD_REQUEST, "CHALLENGE_NOT_FOUND"),
                AuthError::ChallengeExpired => (StatusCode::BAD_REQUEST, "CHALLENGE_EXPIRED"),
                AuthError::ChallengeMismatch => (StatusCode::BAD_REQUEST, "CHALLENGE_MISMATCH"),
                AuthError::TooManyAttempts { .. } => {
                    (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_ATTEMPTS")
                }
                AuthError::Forbidden(_) | AuthError::ProtectedAccount => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN")
                }
                AuthError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            },
            ApiError::Report(err) => match err {
                ReportError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
                ReportError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ReportError::DuplicateBlotter(_) => (StatusCode::CONFLICT, "DUPLICATE_BLOTTER"),
                ReportError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                ReportError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            },
            ApiError::Settings(err) => match err {
                SettingsError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
                SettingsError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            },
            ApiError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        }
    }

    /// Message safe to show to the client
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Auth(err) => err.client_message(),
            ApiError::Report(err) => err.client_message(),
            ApiError::Settings(err) => err.client_message(),
            ApiError::InvalidBody(message) => message.clone(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // body_text names the failing field path for data errors
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.client_message(),
            }
        }));
        let mut response = (status, body).into_response();

        if let ApiError::Auth(AuthError::TooManyAttempts { retry_after_secs }) = self
            && let Ok(value) = HeaderValue::from_str(&retry_after_secs.max(0).to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_map_to_bad_request() {
        let err = ApiError::from(AuthError::InvalidPassword);
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, "INVALID_CREDENTIALS")
        );
        assert_eq!(err.client_message(), "Invalid username or password");
    }

    #[test]
    fn test_session_errors_are_unauthorized() {
        for err in [AuthError::Unauthenticated, AuthError::StaleSession] {
            assert_eq!(ApiError::from(err).status_and_code().0, StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_report_errors() {
        let cases = [
            (ReportError::NotFound(3), StatusCode::NOT_FOUND),
            (
                ReportError::DuplicateBlotter("B-1".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                ReportError::validation("victim.age", "out of range"),
                StatusCode::BAD_REQUEST,
            ),
            (
                ReportError::Forbidden("no".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                ReportError::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_and_code().0, status);
        }
    }

    #[test]
    fn test_database_message_is_generic() {
        let err = ApiError::from(SettingsError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_throttle_sets_retry_after() {
        let response = ApiError::from(AuthError::TooManyAttempts {
            retry_after_secs: 30,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "30");
    }
}
