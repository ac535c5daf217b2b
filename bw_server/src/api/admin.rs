//! Account administration endpoints.
//!
//! Every operation is gated by the role policy in the core library; the
//! handlers only translate between JSON and manager calls.

use axum::{Json, extract::State};
use barangay_watch::auth::{User, UserId};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiResult, extract::ApiJson, middleware::CurrentUser};
use crate::logging;

#[derive(Debug, Deserialize)]
pub struct DeleteAdminRequest {
    pub id: UserId,
}

/// Toggle request; `currentStatus` is the flag as the caller last saw it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleTwoFactorRequest {
    pub admin_id: UserId,
    pub current_status: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleTwoFactorResponse {
    pub success: bool,
    pub user: User,
}

/// Delete an admin account (head-admin only; the head-admin itself is protected)
pub async fn delete_admin(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    ApiJson(payload): ApiJson<DeleteAdminRequest>,
) -> ApiResult<Json<User>> {
    let deleted = state
        .auth_manager
        .delete_admin(&requester, payload.id)
        .await?;
    logging::log_security_event(
        "admin_deleted",
        Some(requester.id),
        &format!("Deleted account {} ({})", deleted.id, deleted.username),
    );
    Ok(Json(deleted))
}

/// Every account, without password hashes
pub async fn get_all_admin(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.auth_manager.list_admins(&requester).await?))
}

/// Flip an account's second-factor requirement.
///
/// Allowed for the head-admin on any account and for an admin on their own.
pub async fn change_admin_enable_two_fa(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    ApiJson(payload): ApiJson<ToggleTwoFactorRequest>,
) -> ApiResult<Json<ToggleTwoFactorResponse>> {
    let user = state
        .auth_manager
        .set_two_factor_requirement(&requester, payload.admin_id, !payload.current_status)
        .await?;
    tracing::info!(
        requester = requester.id,
        target = user.id,
        enabled = user.enable_two_fa,
        "Two-factor requirement changed"
    );
    Ok(Json(ToggleTwoFactorResponse {
        success: true,
        user,
    }))
}
