//! Audit log writer and reader.

use std::sync::Arc;

use super::changes::diff_reports;
use super::models::{AuditAction, AuditLogEntry, FieldChange, NewAuditLogEntry};
use crate::auth::{Action, User, policy};
use crate::db::AuditLogRepository;
use crate::reports::{Report, ReportId, ReportResult};

/// Largest page returned by [`AuditLogger::list`]
pub const MAX_PAGE_SIZE: i64 = 200;

/// Records report activity and serves it back to the head-admin
#[derive(Clone)]
pub struct AuditLogger {
    repo: Arc<dyn AuditLogRepository>,
    log_empty_updates: bool,
}

impl AuditLogger {
    /// Create an audit logger.
    ///
    /// With `log_empty_updates` off, an update that changes nothing is not
    /// recorded.
    pub fn new(repo: Arc<dyn AuditLogRepository>, log_empty_updates: bool) -> Self {
        Self {
            repo,
            log_empty_updates,
        }
    }

    /// Record an edit of a report.
    ///
    /// `before` and `after` must be the stored pre-image and the committed
    /// post-image. Returns `None` when nothing changed and empty updates are
    /// not logged.
    pub async fn record_update(
        &self,
        actor: &User,
        before: &Report,
        after: &Report,
    ) -> ReportResult<Option<AuditLogEntry>> {
        policy::authorize(actor, Action::MutateReport)?;

        let changes = diff_reports(before, after);
        if changes.is_empty() && !self.log_empty_updates {
            log::debug!("Report {} saved without changes, not logged", after.id);
            return Ok(None);
        }

        self.record(actor, AuditAction::UpdatedReport, after, changes)
            .await
            .map(Some)
    }

    /// Append one entry for `action` on `report`.
    pub async fn record(
        &self,
        actor: &User,
        action: AuditAction,
        report: &Report,
        changes: Vec<FieldChange>,
    ) -> ReportResult<AuditLogEntry> {
        let entry = self
            .repo
            .insert(NewAuditLogEntry::for_report(actor.id, action, report, changes))
            .await?;

        log::info!(
            "Audit: user {} {} {} ({} changes)",
            actor.id,
            action,
            entry.blotter_no,
            entry.change_count
        );
        Ok(entry)
    }

    /// Newest entries first; `limit` is clamped to `1..=MAX_PAGE_SIZE`
    pub async fn list(
        &self,
        requester: &User,
        limit: i64,
        offset: i64,
    ) -> ReportResult<Vec<AuditLogEntry>> {
        policy::authorize(requester, Action::ViewAuditLog)?;
        self.repo
            .list(limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
            .await
    }

    /// All entries for one report, oldest first
    pub async fn history(
        &self,
        requester: &User,
        report_id: ReportId,
    ) -> ReportResult<Vec<AuditLogEntry>> {
        policy::authorize(requester, Action::ViewAuditLog)?;
        self.repo.for_report(report_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::InMemoryAuditLogRepository;
    use crate::reports::ReportError;
    use crate::reports::models::fixtures::details;
    use chrono::Utc;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            username: format!("user{id}"),
            role,
            email: None,
            enable_two_fa: false,
            two_factor: None,
            created_at: Utc::now(),
        }
    }

    fn report() -> Report {
        Report {
            id: 1,
            details: details("BLT-1"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_empty_update_respects_flag() {
        let official = user(2, Role::Admin);
        let r = report();

        let logging = AuditLogger::new(Arc::new(InMemoryAuditLogRepository::new()), true);
        let entry = logging.record_update(&official, &r, &r).await.unwrap().unwrap();
        assert_eq!(entry.change_count, 0);

        let silent = AuditLogger::new(Arc::new(InMemoryAuditLogRepository::new()), false);
        assert!(silent.record_update(&official, &r, &r).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_head_admin_cannot_record_updates() {
        let logger = AuditLogger::new(Arc::new(InMemoryAuditLogRepository::new()), true);
        let r = report();
        let err = logger
            .record_update(&user(1, Role::HeadAdmin), &r, &r)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_listing_requires_head_admin() {
        let logger = AuditLogger::new(Arc::new(InMemoryAuditLogRepository::new()), true);
        assert!(logger.list(&user(2, Role::Admin), 10, 0).await.is_err());
        assert!(logger.list(&user(1, Role::HeadAdmin), 0, -5).await.is_ok());
    }
}
