//! Feature flags stored in a single settings row.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::{Action, AuthError, User, policy};

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl SettingsError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            SettingsError::Database(_) => "Internal server error".to_string(),
            SettingsError::Forbidden(_) => self.to_string(),
        }
    }
}

impl From<AuthError> for SettingsError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden(reason) => SettingsError::Forbidden(reason),
            AuthError::Database(e) => SettingsError::Database(e),
            other => SettingsError::Forbidden(other.to_string()),
        }
    }
}

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Storage for application-wide feature flags
#[async_trait]
pub trait FeatureSettings: Send + Sync {
    /// Whether AI summaries are turned on
    async fn ai_enabled(&self) -> SettingsResult<bool>;

    /// Turn AI summaries on or off
    async fn set_ai_enabled(&self, enabled: bool) -> SettingsResult<()>;
}

/// Policy-checked access to [`FeatureSettings`]
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn FeatureSettings>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn FeatureSettings>) -> Self {
        Self { store }
    }

    pub async fn ai_enabled(&self) -> SettingsResult<bool> {
        self.store.ai_enabled().await
    }

    /// Change the AI flag; head-admin only
    pub async fn set_ai_enabled(&self, requester: &User, enabled: bool) -> SettingsResult<bool> {
        policy::authorize(requester, Action::ManageSettings)?;
        self.store.set_ai_enabled(enabled).await?;
        log::info!("User {} set ai_enabled={}", requester.id, enabled);
        Ok(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::InMemoryFeatureSettings;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: 1,
            username: "captain".into(),
            role,
            email: None,
            enable_two_fa: false,
            two_factor: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_only_head_admin_toggles_ai() {
        let service = SettingsService::new(Arc::new(InMemoryFeatureSettings::default()));
        assert!(!service.ai_enabled().await.unwrap());

        let err = service
            .set_ai_enabled(&user(Role::Admin), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::Forbidden(_)));

        service
            .set_ai_enabled(&user(Role::HeadAdmin), true)
            .await
            .unwrap();
        assert!(service.ai_enabled().await.unwrap());
    }
}
