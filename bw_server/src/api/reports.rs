//! Crime report endpoints.
//!
//! Writes go through [`ReportManager`](barangay_watch::ReportManager), which
//! records the audit entry for each one.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use barangay_watch::{
    audit::{AuditAction, AuditLogEntry},
    reports::{Report, ReportDetails, ReportId},
};
use serde::Deserialize;

use super::{
    AppState, error::ApiResult, extract::ApiJson, middleware::CurrentUser,
    request_id::RequestId,
};
use crate::metrics;

/// A report as edited by the client
#[derive(Debug, Deserialize)]
pub struct SelectedReport {
    pub id: ReportId,
    #[serde(flatten)]
    pub details: ReportDetails,
}

/// Body of `/report/changeStatus`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    /// The client's copy before editing; only used to detect stale edits
    #[serde(default)]
    pub old_report_data: Option<serde_json::Value>,
    pub selected_report: SelectedReport,
}

#[derive(Debug, Deserialize)]
pub struct ReportIdRequest {
    pub id: ReportId,
}

/// Save an edited report and log the field-level changes.
///
/// # Response
///
/// - **200 OK**: the stored report after the write
/// - **400 Bad Request**: `VALIDATION_ERROR` naming the offending field
/// - **403 Forbidden**: caller is not an official
/// - **404 Not Found**: no report with that id
pub async fn change_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request_id: RequestId,
    ApiJson(payload): ApiJson<ChangeStatusRequest>,
) -> ApiResult<Json<Report>> {
    let expected = payload
        .old_report_data
        .and_then(|value| serde_json::from_value::<ReportDetails>(value).ok());
    let SelectedReport { id, details } = payload.selected_report;

    let (report, entry) = state
        .report_manager
        .update_report(&user, id, details, expected.as_ref())
        .await?;

    if let Some(entry) = entry {
        metrics::audit_entries_total(entry.action.as_str());
        tracing::info!(
            request_id = request_id.as_str(),
            report_id = id,
            changes = entry.change_count,
            "Report updated"
        );
    }
    Ok(Json(report))
}

/// File a new report
pub async fn create_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(details): ApiJson<ReportDetails>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let report = state.report_manager.create_report(&user, details).await?;
    metrics::audit_entries_total(AuditAction::CreatedReport.as_str());
    Ok((StatusCode::CREATED, Json(report)))
}

/// All reports, newest first
pub async fn list_reports(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Report>>> {
    Ok(Json(state.report_manager.list_reports(&user).await?))
}

/// One report; the read is audited
pub async fn get_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ReportId>,
) -> ApiResult<Json<Report>> {
    let report = state.report_manager.get_report(&user, id).await?;
    metrics::audit_entries_total(AuditAction::ViewedReport.as_str());
    Ok(Json(report))
}

pub async fn delete_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ReportIdRequest>,
) -> ApiResult<Json<Report>> {
    let report = state.report_manager.delete_report(&user, payload.id).await?;
    metrics::audit_entries_total(AuditAction::DeletedReport.as_str());
    Ok(Json(report))
}

/// Audit trail of one report, oldest first
pub async fn report_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ReportId>,
) -> ApiResult<Json<Vec<AuditLogEntry>>> {
    Ok(Json(state.report_manager.audit().history(&user, id).await?))
}
