//! Outbound delivery of one-time login codes.

use async_trait::async_trait;

use super::errors::AuthResult;
use super::models::User;

/// Sends a freshly issued one-time code to its account holder
#[async_trait]
pub trait ChallengeDelivery: Send + Sync {
    async fn deliver(&self, user: &User, code: &str) -> AuthResult<()>;
}

/// Writes codes to the debug log only; for development and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait]
impl ChallengeDelivery for LogDelivery {
    async fn deliver(&self, user: &User, code: &str) -> AuthResult<()> {
        log::debug!("Login code for {} ({}): {}", user.username, user.id, code);
        Ok(())
    }
}
