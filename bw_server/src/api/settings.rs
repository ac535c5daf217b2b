//! Feature flag endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiResult, extract::ApiJson, middleware::CurrentUser};

#[derive(Debug, Serialize, Deserialize)]
pub struct AiSetting {
    pub enabled: bool,
}

pub async fn get_ai_setting(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> ApiResult<Json<AiSetting>> {
    let enabled = state.settings.ai_enabled().await?;
    Ok(Json(AiSetting { enabled }))
}

/// Turn AI summaries on or off (head-admin only)
pub async fn set_ai_setting(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<AiSetting>,
) -> ApiResult<Json<AiSetting>> {
    let enabled = state.settings.set_ai_enabled(&user, payload.enabled).await?;
    Ok(Json(AiSetting { enabled }))
}
