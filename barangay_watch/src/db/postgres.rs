//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::is_unique_violation;
use super::repository::{AuditLogRepository, ReportRepository, TipRepository, UserRepository};
use crate::audit::{AuditLogEntry, FieldChange, NewAuditLogEntry};
use crate::auth::{
    AuthError, AuthResult, NewUser, TwoFactorChallenge, User, UserCredentials, UserId,
};
use crate::reports::{
    Location, Report, ReportDetails, ReportError, ReportId, ReportResult, Suspect, Victim,
};
use crate::settings::{FeatureSettings, SettingsResult};
use crate::tips::{CrimeTip, NewTip};

const HEAD_ADMIN_INDEX: &str = "users_single_head_admin";

macro_rules! user_query {
    ($tail:literal) => {
        concat!(
            "SELECT id, username, password_hash, role, email, enable_two_fa,
                    two_fa_code, two_fa_code_expiry, created_at
             FROM users ",
            $tail
        )
    };
}

const REPORT_COLUMNS: &str = "id, blotter_no, barangay, offense, date_reported, time_reported,
     date_committed, time_committed, victim, suspect, narrative, status,
     latitude, longitude, created_at, updated_at";

const AUDIT_COLUMNS: &str = "id, admin_id, action, report_id, blotter_no, offense, barangay,
     changes, change_count, created_at";

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn location_from(lat: Option<f64>, lng: Option<f64>) -> Option<Location> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Location { lat, lng }),
        _ => None,
    }
}

fn credentials_from_row(r: &PgRow) -> Result<UserCredentials, sqlx::Error> {
    let role: String = r.try_get("role")?;
    let code: Option<String> = r.try_get("two_fa_code")?;
    let expiry: Option<DateTime<Utc>> = r.try_get("two_fa_code_expiry")?;

    Ok(UserCredentials {
        user: User {
            id: r.try_get("id")?,
            username: r.try_get("username")?,
            role: role.parse().map_err(decode_error)?,
            email: r.try_get("email")?,
            enable_two_fa: r.try_get("enable_two_fa")?,
            two_factor: match (code, expiry) {
                (Some(code), Some(expires_at)) => Some(TwoFactorChallenge { code, expires_at }),
                _ => None,
            },
            created_at: r.try_get("created_at")?,
        },
        password_hash: r.try_get("password_hash")?,
    })
}

fn report_from_row(r: &PgRow) -> Result<Report, sqlx::Error> {
    let status: String = r.try_get("status")?;

    Ok(Report {
        id: r.try_get("id")?,
        details: ReportDetails {
            blotter_no: r.try_get("blotter_no")?,
            barangay: r.try_get("barangay")?,
            offense: r.try_get("offense")?,
            date_reported: r.try_get("date_reported")?,
            time_reported: r.try_get("time_reported")?,
            date_committed: r.try_get("date_committed")?,
            time_committed: r.try_get("time_committed")?,
            victim: r.try_get::<Json<Victim>, _>("victim")?.0,
            suspect: r.try_get::<Json<Suspect>, _>("suspect")?.0,
            narrative: r.try_get("narrative")?,
            status: status.parse().map_err(decode_error)?,
            location: location_from(r.try_get("latitude")?, r.try_get("longitude")?),
        },
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn audit_from_row(r: &PgRow) -> Result<AuditLogEntry, sqlx::Error> {
    let action: String = r.try_get("action")?;
    let change_count: i32 = r.try_get("change_count")?;

    Ok(AuditLogEntry {
        id: r.try_get("id")?,
        admin_id: r.try_get("admin_id")?,
        action: action.parse().map_err(decode_error)?,
        report_id: r.try_get("report_id")?,
        blotter_no: r.try_get("blotter_no")?,
        offense: r.try_get("offense")?,
        barangay: r.try_get("barangay")?,
        changes: r.try_get::<Json<Vec<FieldChange>>, _>("changes")?.0,
        change_count: usize::try_from(change_count).unwrap_or_default(),
        created_at: r.try_get("created_at")?,
    })
}

fn tip_from_row(r: &PgRow) -> Result<CrimeTip, sqlx::Error> {
    Ok(CrimeTip {
        id: r.try_get("id")?,
        barangay: r.try_get("barangay")?,
        description: r.try_get("description")?,
        location: location_from(r.try_get("latitude")?, r.try_get("longitude")?),
        contact: r.try_get("contact")?,
        created_at: r.try_get("created_at")?,
    })
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> AuthResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (username, password_hash, role, email)
             VALUES ($1, $2, $3, $4)
             RETURNING id, created_at",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e
                && db.constraint() == Some(HEAD_ADMIN_INDEX)
            {
                AuthError::Forbidden("a head-admin account already exists".to_string())
            } else if is_unique_violation(&e) {
                AuthError::UsernameTaken
            } else {
                AuthError::Database(e)
            }
        })?;

        Ok(User {
            id: row.try_get("id")?,
            username: user.username,
            role: user.role,
            email: user.email,
            enable_two_fa: false,
            two_factor: None,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn count(&self) -> AuthResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        Ok(self.find_credentials_by_id(id).await?.map(|c| c.user))
    }

    async fn find_credentials(&self, username: &str) -> AuthResult<Option<UserCredentials>> {
        let row = sqlx::query(user_query!("WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(credentials_from_row).transpose()?)
    }

    async fn find_credentials_by_id(&self, id: UserId) -> AuthResult<Option<UserCredentials>> {
        let row = sqlx::query(user_query!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(credentials_from_row).transpose()?)
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        let rows = sqlx::query(user_query!("ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| credentials_from_row(r).map(|c| c.user))
            .collect::<Result<_, _>>()
            .map_err(AuthError::from)
    }

    async fn delete(&self, id: UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "DELETE FROM users WHERE id = $1
             RETURNING id, username, password_hash, role, email, enable_two_fa,
                       two_fa_code, two_fa_code_expiry, created_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .as_ref()
            .map(credentials_from_row)
            .transpose()?
            .map(|c| c.user))
    }

    async fn set_two_factor_enabled(
        &self,
        id: UserId,
        enabled: bool,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "UPDATE users SET enable_two_fa = $2 WHERE id = $1
             RETURNING id, username, password_hash, role, email, enable_two_fa,
                       two_fa_code, two_fa_code_expiry, created_at",
        )
        .bind(id)
        .bind(enabled)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .as_ref()
            .map(credentials_from_row)
            .transpose()?
            .map(|c| c.user))
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AuthResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound(id));
        }
        Ok(())
    }

    async fn store_two_factor_challenge(
        &self,
        id: UserId,
        challenge: &TwoFactorChallenge,
    ) -> AuthResult<()> {
        let result = sqlx::query(
            "UPDATE users SET two_fa_code = $2, two_fa_code_expiry = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(&challenge.code)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound(id));
        }
        Ok(())
    }

    async fn consume_two_factor_challenge(&self, id: UserId, code: &str) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET two_fa_code = NULL, two_fa_code_expiry = NULL
             WHERE id = $1 AND two_fa_code = $2",
        )
        .bind(id)
        .bind(code)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// PostgreSQL report storage
pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_report_write(err: sqlx::Error, details: &ReportDetails) -> ReportError {
    if is_unique_violation(&err) {
        ReportError::DuplicateBlotter(details.blotter_no.clone())
    } else {
        ReportError::Database(err)
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn insert(&self, details: &ReportDetails) -> ReportResult<Report> {
        let sql = format!(
            "INSERT INTO reports (blotter_no, barangay, offense, date_reported, time_reported,
                                  date_committed, time_committed, victim, suspect, narrative,
                                  status, latitude, longitude)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {REPORT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&details.blotter_no)
            .bind(&details.barangay)
            .bind(&details.offense)
            .bind(details.date_reported)
            .bind(details.time_reported)
            .bind(details.date_committed)
            .bind(details.time_committed)
            .bind(Json(&details.victim))
            .bind(Json(&details.suspect))
            .bind(&details.narrative)
            .bind(details.status.as_str())
            .bind(details.location.map(|l| l.lat))
            .bind(details.location.map(|l| l.lng))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_report_write(e, details))?;

        Ok(report_from_row(&row)?)
    }

    async fn find(&self, id: ReportId) -> ReportResult<Option<Report>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(report_from_row).transpose()?)
    }

    async fn update(&self, id: ReportId, details: &ReportDetails) -> ReportResult<Option<Report>> {
        let sql = format!(
            "UPDATE reports SET
                blotter_no = $2, barangay = $3, offense = $4, date_reported = $5,
                time_reported = $6, date_committed = $7, time_committed = $8,
                victim = $9, suspect = $10, narrative = $11, status = $12,
                latitude = $13, longitude = $14, updated_at = NOW()
             WHERE id = $1
             RETURNING {REPORT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&details.blotter_no)
            .bind(&details.barangay)
            .bind(&details.offense)
            .bind(details.date_reported)
            .bind(details.time_reported)
            .bind(details.date_committed)
            .bind(details.time_committed)
            .bind(Json(&details.victim))
            .bind(Json(&details.suspect))
            .bind(&details.narrative)
            .bind(details.status.as_str())
            .bind(details.location.map(|l| l.lat))
            .bind(details.location.map(|l| l.lng))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_report_write(e, details))?;

        Ok(row.as_ref().map(report_from_row).transpose()?)
    }

    async fn delete(&self, id: ReportId) -> ReportResult<Option<Report>> {
        let sql = format!("DELETE FROM reports WHERE id = $1 RETURNING {REPORT_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(report_from_row).transpose()?)
    }

    async fn list(&self) -> ReportResult<Vec<Report>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(report_from_row).collect::<Result<_, _>>()?)
    }
}

/// PostgreSQL audit log storage. The table rejects updates and deletes.
pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn insert(&self, entry: NewAuditLogEntry) -> ReportResult<AuditLogEntry> {
        let row = sqlx::query(
            "INSERT INTO audit_logs (admin_id, action, report_id, blotter_no, offense,
                                     barangay, changes, change_count)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id, created_at",
        )
        .bind(entry.admin_id)
        .bind(entry.action.as_str())
        .bind(entry.report_id)
        .bind(&entry.blotter_no)
        .bind(&entry.offense)
        .bind(&entry.barangay)
        .bind(Json(&entry.changes))
        .bind(i32::try_from(entry.changes.len()).unwrap_or(i32::MAX))
        .fetch_one(&self.pool)
        .await?;

        let id = row.try_get("id")?;
        let created_at = row.try_get("created_at")?;
        Ok(entry.into_entry(id, created_at))
    }

    async fn list(&self, limit: i64, offset: i64) -> ReportResult<Vec<AuditLogEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(audit_from_row).collect::<Result<_, _>>()?)
    }

    async fn for_report(&self, report_id: ReportId) -> ReportResult<Vec<AuditLogEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE report_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(report_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(audit_from_row).collect::<Result<_, _>>()?)
    }
}

/// PostgreSQL tip storage
pub struct PgTipRepository {
    pool: PgPool,
}

impl PgTipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TipRepository for PgTipRepository {
    async fn insert(&self, tip: &NewTip) -> ReportResult<CrimeTip> {
        let row = sqlx::query(
            "INSERT INTO crime_tips (barangay, description, latitude, longitude, contact)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, barangay, description, latitude, longitude, contact, created_at",
        )
        .bind(&tip.barangay)
        .bind(&tip.description)
        .bind(tip.location.map(|l| l.lat))
        .bind(tip.location.map(|l| l.lng))
        .bind(&tip.contact)
        .fetch_one(&self.pool)
        .await?;
        Ok(tip_from_row(&row)?)
    }

    async fn list(&self) -> ReportResult<Vec<CrimeTip>> {
        let rows = sqlx::query(
            "SELECT id, barangay, description, latitude, longitude, contact, created_at
             FROM crime_tips ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(tip_from_row).collect::<Result<_, _>>()?)
    }
}

/// Feature flags in the single `app_settings` row
pub struct PgFeatureSettings {
    pool: PgPool,
}

impl PgFeatureSettings {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeatureSettings for PgFeatureSettings {
    async fn ai_enabled(&self) -> SettingsResult<bool> {
        let row = sqlx::query("SELECT ai_enabled FROM app_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(r) => r.try_get("ai_enabled")?,
            None => false,
        })
    }

    async fn set_ai_enabled(&self, enabled: bool) -> SettingsResult<()> {
        sqlx::query(
            "INSERT INTO app_settings (id, ai_enabled, updated_at) VALUES (1, $1, NOW())
             ON CONFLICT (id) DO UPDATE SET ai_enabled = EXCLUDED.ai_enabled, updated_at = NOW()",
        )
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
