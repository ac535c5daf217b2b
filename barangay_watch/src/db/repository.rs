//! Repository trait definitions for testability and dependency injection.
//!
//! Managers hold these as trait objects; see [`super::postgres`] and
//! [`super::memory`] for the implementations.

use async_trait::async_trait;

use crate::audit::{AuditLogEntry, NewAuditLogEntry};
use crate::auth::{AuthResult, NewUser, TwoFactorChallenge, User, UserCredentials, UserId};
use crate::reports::{Report, ReportDetails, ReportId, ReportResult};
use crate::tips::{CrimeTip, NewTip};

/// Trait for user/authentication repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; `UsernameTaken` on a duplicate name
    async fn create(&self, user: NewUser) -> AuthResult<User>;

    /// Number of accounts
    async fn count(&self) -> AuthResult<i64>;

    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>>;

    /// Find user and password hash by exact username
    async fn find_credentials(&self, username: &str) -> AuthResult<Option<UserCredentials>>;

    /// Find user and password hash by ID
    async fn find_credentials_by_id(&self, id: UserId) -> AuthResult<Option<UserCredentials>>;

    /// All accounts, oldest first
    async fn list(&self) -> AuthResult<Vec<User>>;

    /// Delete an account, returning it if it existed
    async fn delete(&self, id: UserId) -> AuthResult<Option<User>>;

    /// Set the 2FA requirement flag
    async fn set_two_factor_enabled(&self, id: UserId, enabled: bool)
    -> AuthResult<Option<User>>;

    /// Replace the password hash
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AuthResult<()>;

    /// Store code and expiry together, replacing any outstanding challenge
    async fn store_two_factor_challenge(
        &self,
        id: UserId,
        challenge: &TwoFactorChallenge,
    ) -> AuthResult<()>;

    /// Clear code and expiry together if the stored code is still `code`.
    ///
    /// Returns `false` when the challenge was already consumed or replaced.
    async fn consume_two_factor_challenge(&self, id: UserId, code: &str) -> AuthResult<bool>;
}

/// Trait for crime report storage
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a report; `DuplicateBlotter` on a reused blotter number
    async fn insert(&self, details: &ReportDetails) -> ReportResult<Report>;

    async fn find(&self, id: ReportId) -> ReportResult<Option<Report>>;

    /// Overwrite all fields in one write and bump `updated_at`
    async fn update(&self, id: ReportId, details: &ReportDetails) -> ReportResult<Option<Report>>;

    async fn delete(&self, id: ReportId) -> ReportResult<Option<Report>>;

    /// All reports, newest first
    async fn list(&self) -> ReportResult<Vec<Report>>;
}

/// Append-only audit log storage.
///
/// There are deliberately no update or delete operations.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn insert(&self, entry: NewAuditLogEntry) -> ReportResult<AuditLogEntry>;

    /// Newest first
    async fn list(&self, limit: i64, offset: i64) -> ReportResult<Vec<AuditLogEntry>>;

    /// Entries for one report, oldest first
    async fn for_report(&self, report_id: ReportId) -> ReportResult<Vec<AuditLogEntry>>;
}

/// Public tip storage
#[async_trait]
pub trait TipRepository: Send + Sync {
    async fn insert(&self, tip: &NewTip) -> ReportResult<CrimeTip>;

    /// Newest first
    async fn list(&self) -> ReportResult<Vec<CrimeTip>>;
}
