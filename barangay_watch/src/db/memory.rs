//! In-process repository implementations.
//!
//! Used by the test suites and for running the server without PostgreSQL.
//! They honour the same uniqueness rules as the schema.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::repository::{AuditLogRepository, ReportRepository, TipRepository, UserRepository};
use crate::audit::{AuditLogEntry, AuditLogId, NewAuditLogEntry};
use crate::auth::{
    AuthError, AuthResult, NewUser, Role, TwoFactorChallenge, User, UserCredentials, UserId,
};
use crate::reports::{Report, ReportDetails, ReportError, ReportId, ReportResult};
use crate::settings::{FeatureSettings, SettingsResult};
use crate::tips::{CrimeTip, NewTip, TipId};

/// Rows keyed by a sequential id
struct Table<K, V> {
    next_id: K,
    rows: BTreeMap<K, V>,
}

impl<V> Default for Table<i64, V> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<V> Table<i64, V> {
    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory `UserRepository`
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: Mutex<Table<UserId, UserCredentials>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> AuthResult<User> {
        let mut table = lock(&self.table);
        if table
            .rows
            .values()
            .any(|c| c.user.username == user.username)
        {
            return Err(AuthError::UsernameTaken);
        }
        if user.role == Role::HeadAdmin
            && table.rows.values().any(|c| c.user.role == Role::HeadAdmin)
        {
            return Err(AuthError::Forbidden(
                "a head-admin account already exists".to_string(),
            ));
        }

        let id = table.allocate();
        let created = User {
            id,
            username: user.username,
            role: user.role,
            email: user.email,
            enable_two_fa: false,
            two_factor: None,
            created_at: Utc::now(),
        };
        table.rows.insert(
            id,
            UserCredentials {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn count(&self) -> AuthResult<i64> {
        Ok(lock(&self.table).rows.len() as i64)
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        Ok(lock(&self.table).rows.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials(&self, username: &str) -> AuthResult<Option<UserCredentials>> {
        Ok(lock(&self.table)
            .rows
            .values()
            .find(|c| c.user.username == username)
            .cloned())
    }

    async fn find_credentials_by_id(&self, id: UserId) -> AuthResult<Option<UserCredentials>> {
        Ok(lock(&self.table).rows.get(&id).cloned())
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        Ok(lock(&self.table)
            .rows
            .values()
            .map(|c| c.user.clone())
            .collect())
    }

    async fn delete(&self, id: UserId) -> AuthResult<Option<User>> {
        Ok(lock(&self.table).rows.remove(&id).map(|c| c.user))
    }

    async fn set_two_factor_enabled(
        &self,
        id: UserId,
        enabled: bool,
    ) -> AuthResult<Option<User>> {
        Ok(lock(&self.table).rows.get_mut(&id).map(|c| {
            c.user.enable_two_fa = enabled;
            c.user.clone()
        }))
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AuthResult<()> {
        let mut table = lock(&self.table);
        let creds = table
            .rows
            .get_mut(&id)
            .ok_or(AuthError::AccountNotFound(id))?;
        creds.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn store_two_factor_challenge(
        &self,
        id: UserId,
        challenge: &TwoFactorChallenge,
    ) -> AuthResult<()> {
        let mut table = lock(&self.table);
        let creds = table
            .rows
            .get_mut(&id)
            .ok_or(AuthError::AccountNotFound(id))?;
        creds.user.two_factor = Some(challenge.clone());
        Ok(())
    }

    async fn consume_two_factor_challenge(&self, id: UserId, code: &str) -> AuthResult<bool> {
        let mut table = lock(&self.table);
        match table.rows.get_mut(&id) {
            Some(creds) if creds.user.two_factor.as_ref().is_some_and(|c| c.code == code) => {
                creds.user.two_factor = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory `ReportRepository`
#[derive(Default)]
pub struct InMemoryReportRepository {
    table: Mutex<Table<ReportId, Report>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn blotter_taken(table: &Table<ReportId, Report>, blotter_no: &str, except: Option<ReportId>) -> bool {
    table
        .rows
        .values()
        .any(|r| r.details.blotter_no == blotter_no && Some(r.id) != except)
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn insert(&self, details: &ReportDetails) -> ReportResult<Report> {
        let mut table = lock(&self.table);
        if blotter_taken(&table, &details.blotter_no, None) {
            return Err(ReportError::DuplicateBlotter(details.blotter_no.clone()));
        }

        let now = Utc::now();
        let report = Report {
            id: table.allocate(),
            details: details.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(report.id, report.clone());
        Ok(report)
    }

    async fn find(&self, id: ReportId) -> ReportResult<Option<Report>> {
        Ok(lock(&self.table).rows.get(&id).cloned())
    }

    async fn update(&self, id: ReportId, details: &ReportDetails) -> ReportResult<Option<Report>> {
        let mut table = lock(&self.table);
        if !table.rows.contains_key(&id) {
            return Ok(None);
        }
        if blotter_taken(&table, &details.blotter_no, Some(id)) {
            return Err(ReportError::DuplicateBlotter(details.blotter_no.clone()));
        }

        Ok(table.rows.get_mut(&id).map(|report| {
            report.details = details.clone();
            report.updated_at = Utc::now();
            report.clone()
        }))
    }

    async fn delete(&self, id: ReportId) -> ReportResult<Option<Report>> {
        Ok(lock(&self.table).rows.remove(&id))
    }

    async fn list(&self) -> ReportResult<Vec<Report>> {
        Ok(lock(&self.table).rows.values().rev().cloned().collect())
    }
}

/// In-memory `AuditLogRepository`
#[derive(Default)]
pub struct InMemoryAuditLogRepository {
    table: Mutex<Table<AuditLogId, AuditLogEntry>>,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        lock(&self.table).rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn insert(&self, entry: NewAuditLogEntry) -> ReportResult<AuditLogEntry> {
        let mut table = lock(&self.table);
        let stored = entry.into_entry(table.allocate(), Utc::now());
        table.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self, limit: i64, offset: i64) -> ReportResult<Vec<AuditLogEntry>> {
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(lock(&self.table)
            .rows
            .values()
            .rev()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn for_report(&self, report_id: ReportId) -> ReportResult<Vec<AuditLogEntry>> {
        Ok(lock(&self.table)
            .rows
            .values()
            .filter(|e| e.report_id == report_id)
            .cloned()
            .collect())
    }
}

/// In-memory `TipRepository`
#[derive(Default)]
pub struct InMemoryTipRepository {
    table: Mutex<Table<TipId, CrimeTip>>,
}

impl InMemoryTipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TipRepository for InMemoryTipRepository {
    async fn insert(&self, tip: &NewTip) -> ReportResult<CrimeTip> {
        let mut table = lock(&self.table);
        let stored = CrimeTip {
            id: table.allocate(),
            barangay: tip.barangay.clone(),
            description: tip.description.clone(),
            location: tip.location,
            contact: tip.contact.clone(),
            created_at: Utc::now(),
        };
        table.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> ReportResult<Vec<CrimeTip>> {
        Ok(lock(&self.table).rows.values().rev().cloned().collect())
    }
}

/// In-memory `FeatureSettings`, AI off by default
#[derive(Default)]
pub struct InMemoryFeatureSettings {
    ai_enabled: Mutex<bool>,
}

#[async_trait]
impl FeatureSettings for InMemoryFeatureSettings {
    async fn ai_enabled(&self) -> SettingsResult<bool> {
        Ok(*lock(&self.ai_enabled))
    }

    async fn set_ai_enabled(&self, enabled: bool) -> SettingsResult<()> {
        *lock(&self.ai_enabled) = enabled;
        Ok(())
    }
}
