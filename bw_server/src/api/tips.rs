//! Public crime tips.

use axum::{Json, extract::State, http::StatusCode};
use barangay_watch::tips::{CrimeTip, NewTip};

use super::{AppState, error::ApiResult, extract::ApiJson, middleware::CurrentUser};

/// Submit an anonymous tip; no session required
pub async fn submit_tip(
    State(state): State<AppState>,
    ApiJson(tip): ApiJson<NewTip>,
) -> ApiResult<(StatusCode, Json<CrimeTip>)> {
    let tip = state.tip_manager.submit(tip).await?;
    Ok((StatusCode::CREATED, Json(tip)))
}

pub async fn list_tips(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<CrimeTip>>> {
    Ok(Json(state.tip_manager.list(&user).await?))
}
