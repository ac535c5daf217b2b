//! Authentication error types.

use thiserror::Error;

use super::models::UserId;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Password verification failed
    #[error("Invalid password")]
    InvalidPassword,

    /// No user with the given username
    #[error("User not found")]
    UserNotFound,

    /// Username already exists
    #[error("Username already exists")]
    UsernameTaken,

    /// Invalid username format
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// JWT signature or expiry check failed
    #[error("JWT error: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// No session cookie on the request
    #[error("Not authenticated")]
    Unauthenticated,

    /// Session token is valid but its account no longer exists
    #[error("Session user no longer exists")]
    StaleSession,

    /// No outstanding one-time code for the account
    #[error("No verification code was requested")]
    ChallengeNotFound,

    /// The one-time code is past its expiry
    #[error("Verification code has expired")]
    ChallengeExpired,

    /// The submitted one-time code does not match
    #[error("Invalid verification code")]
    ChallengeMismatch,

    /// Too many failed attempts for this key
    #[error("Too many attempts, try again in {retry_after_secs} seconds")]
    TooManyAttempts { retry_after_secs: i64 },

    /// Role policy denied the action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Target account of an administrative action does not exist
    #[error("Account {0} not found")]
    AccountNotFound(UserId),

    /// Attempt to delete the head-admin account
    #[error("The head-admin account cannot be deleted")]
    ProtectedAccount,
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Unknown usernames and wrong passwords share one message so the
    /// response does not reveal which accounts exist.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::HashingFailed => {
                "Internal server error".to_string()
            }
            AuthError::InvalidToken(_) => "Invalid or expired session".to_string(),
            AuthError::UserNotFound | AuthError::InvalidPassword => {
                "Invalid username or password".to_string()
            }
            AuthError::StaleSession => "Not authenticated".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the error is a credential failure on login
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, AuthError::UserNotFound | AuthError::InvalidPassword)
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_errors_share_message() {
        assert_eq!(
            AuthError::UserNotFound.client_message(),
            AuthError::InvalidPassword.client_message()
        );
    }

    #[test]
    fn test_database_errors_are_sanitized() {
        let err = AuthError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_throttle_message_mentions_delay() {
        let err = AuthError::TooManyAttempts {
            retry_after_secs: 42,
        };
        assert!(err.client_message().contains("42"));
    }
}
