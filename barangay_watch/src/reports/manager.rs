//! Report manager: policy, validation, persistence and audit in one place.

use std::sync::Arc;

use super::errors::{ReportError, ReportResult};
use super::models::{Report, ReportDetails, ReportId};
use crate::audit::{AuditAction, AuditLogEntry, AuditLogger};
use crate::auth::{Action, User, policy};
use crate::db::ReportRepository;

/// Report manager
#[derive(Clone)]
pub struct ReportManager {
    repo: Arc<dyn ReportRepository>,
    audit: AuditLogger,
}

impl ReportManager {
    pub fn new(repo: Arc<dyn ReportRepository>, audit: AuditLogger) -> Self {
        Self { repo, audit }
    }

    /// Audit logger shared with this manager
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// File a new report.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor is an official, `Validation` for bad
    /// fields, `DuplicateBlotter` if the blotter number is taken.
    pub async fn create_report(
        &self,
        actor: &User,
        mut details: ReportDetails,
    ) -> ReportResult<Report> {
        policy::authorize(actor, Action::MutateReport)?;
        details.normalize();
        details.validate()?;

        let report = self.repo.insert(&details).await?;
        self.audit
            .record(actor, AuditAction::CreatedReport, &report, Vec::new())
            .await?;
        Ok(report)
    }

    /// Overwrite a report and log what changed.
    ///
    /// The diff is taken against the stored row, not against `expected`;
    /// `expected` is the client's view of the report before editing and only
    /// produces a warning when it is stale.
    pub async fn update_report(
        &self,
        actor: &User,
        id: ReportId,
        mut details: ReportDetails,
        expected: Option<&ReportDetails>,
    ) -> ReportResult<(Report, Option<AuditLogEntry>)> {
        policy::authorize(actor, Action::MutateReport)?;
        details.normalize();
        details.validate()?;

        let before = self.repo.find(id).await?.ok_or(ReportError::NotFound(id))?;
        if let Some(expected) = expected.cloned().map(|mut d| {
            d.normalize();
            d
        }) && expected != before.details
        {
            log::warn!(
                "Report {} changed since user {} loaded it; last write wins",
                id,
                actor.id
            );
        }

        let after = self
            .repo
            .update(id, &details)
            .await?
            .ok_or(ReportError::NotFound(id))?;

        // Report is committed at this point; a failed audit write is surfaced as-is
        let entry = self
            .audit
            .record_update(actor, &before, &after)
            .await
            .inspect_err(|e| {
                log::error!("Report {} updated but audit entry failed: {}", id, e);
            })?;

        Ok((after, entry))
    }

    /// Remove a report, returning its last state
    pub async fn delete_report(&self, actor: &User, id: ReportId) -> ReportResult<Report> {
        policy::authorize(actor, Action::MutateReport)?;

        let report = self.repo.delete(id).await?.ok_or(ReportError::NotFound(id))?;
        self.audit
            .record(actor, AuditAction::DeletedReport, &report, Vec::new())
            .await?;
        Ok(report)
    }

    /// Fetch one report; the read itself is audited
    pub async fn get_report(&self, actor: &User, id: ReportId) -> ReportResult<Report> {
        policy::authorize(actor, Action::ReadReports)?;

        let report = self.repo.find(id).await?.ok_or(ReportError::NotFound(id))?;
        self.audit
            .record(actor, AuditAction::ViewedReport, &report, Vec::new())
            .await?;
        Ok(report)
    }

    /// All reports, newest first
    pub async fn list_reports(&self, actor: &User) -> ReportResult<Vec<Report>> {
        policy::authorize(actor, Action::ReadReports)?;
        self.repo.list().await
    }
}
