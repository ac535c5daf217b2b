//! Audit log review.

use axum::{
    Json,
    extract::{Query, State},
};
use barangay_watch::audit::AuditLogEntry;
use serde::Deserialize;

use super::{AppState, error::ApiResult, middleware::CurrentUser};

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Page through the audit log, newest first (head-admin only)
pub async fn list_audit_logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditLogEntry>>> {
    let entries = state
        .report_manager
        .audit()
        .list(
            &user,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            query.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(entries))
}
