//! Anonymous crime tips from the public.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{Action, User, policy};
use crate::db::TipRepository;
use crate::reports::{Location, ReportError, ReportResult};

/// Tip ID type
pub type TipId = i64;

/// Longest accepted tip description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Stored tip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeTip {
    pub id: TipId,
    pub barangay: String,
    pub description: String,
    pub location: Option<Location>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tip as submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTip {
    pub barangay: String,
    pub description: String,
    pub location: Option<Location>,
    pub contact: Option<String>,
}

impl NewTip {
    pub fn validate(&self) -> ReportResult<()> {
        if self.barangay.trim().is_empty() {
            return Err(ReportError::validation("barangay", "must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(ReportError::validation("description", "must not be empty"));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ReportError::validation(
                "description",
                format!("must be at most {MAX_DESCRIPTION_CHARS} characters"),
            ));
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }
}

/// Tip manager
#[derive(Clone)]
pub struct TipManager {
    repo: Arc<dyn TipRepository>,
}

impl TipManager {
    pub fn new(repo: Arc<dyn TipRepository>) -> Self {
        Self { repo }
    }

    /// Accept a tip from anyone; no account involved
    pub async fn submit(&self, tip: NewTip) -> ReportResult<CrimeTip> {
        tip.validate()?;
        let stored = self.repo.insert(&tip).await?;
        log::info!("Tip {} received for {}", stored.id, stored.barangay);
        Ok(stored)
    }

    /// All tips, newest first
    pub async fn list(&self, requester: &User) -> ReportResult<Vec<CrimeTip>> {
        policy::authorize(requester, Action::ReadTips)?;
        self.repo.list().await
    }
}
