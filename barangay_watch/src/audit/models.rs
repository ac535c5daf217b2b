//! Audit log data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::UserId;
use crate::reports::{Report, ReportId};

/// Audit entry ID type
pub type AuditLogId = i64;

/// What an official did to a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "Created Report")]
    CreatedReport,
    #[serde(rename = "Updated Report")]
    UpdatedReport,
    #[serde(rename = "Deleted Report")]
    DeletedReport,
    #[serde(rename = "Viewed Report")]
    ViewedReport,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreatedReport => "Created Report",
            AuditAction::UpdatedReport => "Updated Report",
            AuditAction::DeletedReport => "Deleted Report",
            AuditAction::ViewedReport => "Viewed Report",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created Report" => Ok(AuditAction::CreatedReport),
            "Updated Report" => Ok(AuditAction::UpdatedReport),
            "Deleted Report" => Ok(AuditAction::DeletedReport),
            "Viewed Report" => Ok(AuditAction::ViewedReport),
            other => Err(format!("unknown audit action '{other}'")),
        }
    }
}

/// One changed field, with both sides already stringified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// Persisted audit entry. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub admin_id: UserId,
    pub action: AuditAction,
    pub report_id: ReportId,
    pub blotter_no: String,
    pub offense: String,
    pub barangay: String,
    pub changes: Vec<FieldChange>,
    pub change_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Audit entry before insertion
#[derive(Debug, Clone)]
pub struct NewAuditLogEntry {
    pub admin_id: UserId,
    pub action: AuditAction,
    pub report_id: ReportId,
    pub blotter_no: String,
    pub offense: String,
    pub barangay: String,
    pub changes: Vec<FieldChange>,
}

impl NewAuditLogEntry {
    /// Entry describing `action` on `report`, identified by its current values
    pub fn for_report(
        admin_id: UserId,
        action: AuditAction,
        report: &Report,
        changes: Vec<FieldChange>,
    ) -> Self {
        Self {
            admin_id,
            action,
            report_id: report.id,
            blotter_no: report.details.blotter_no.clone(),
            offense: report.details.offense.clone(),
            barangay: report.details.barangay.clone(),
            changes,
        }
    }

    /// Turn into a stored entry; `change_count` always equals `changes.len()`
    pub fn into_entry(self, id: AuditLogId, created_at: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id,
            admin_id: self.admin_id,
            action: self.action,
            report_id: self.report_id,
            blotter_no: self.blotter_no,
            offense: self.offense,
            barangay: self.barangay,
            change_count: self.changes.len(),
            changes: self.changes,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_text_round_trip() {
        for action in [
            AuditAction::CreatedReport,
            AuditAction::UpdatedReport,
            AuditAction::DeletedReport,
            AuditAction::ViewedReport,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
            assert_eq!(serde_json::to_value(action).unwrap(), action.as_str());
        }
    }

    #[test]
    fn test_change_count_matches_changes() {
        let entry = NewAuditLogEntry {
            admin_id: 2,
            action: AuditAction::UpdatedReport,
            report_id: 9,
            blotter_no: "BLT-9".into(),
            offense: "Theft".into(),
            barangay: "Poblacion".into(),
            changes: vec![FieldChange {
                field: "status".into(),
                old_value: "Unsolved".into(),
                new_value: "Solved".into(),
            }],
        }
        .into_entry(1, Utc::now());

        assert_eq!(entry.change_count, 1);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["changeCount"], 1);
        assert_eq!(json["changes"][0]["oldValue"], "Unsolved");
    }
}
