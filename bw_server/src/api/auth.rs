//! Authentication API endpoints.
//!
//! Login is a one- or two-step flow. Accounts without a second factor get the
//! session cookie straight from `/auth/login`; the rest receive
//! `{"step": "2fa", "userId": ..}` and finish at `/auth/verify-2fa`.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use barangay_watch::auth::{
    AuthError, LoginOutcome, LoginRequest, RegisterRequest, Role, User, UserId,
};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    error::ApiResult,
    extract::ApiJson,
    middleware::{CurrentUser, SESSION_COOKIE, optional_session},
};
use crate::{logging, metrics};

/// First-step response when a one-time code was sent
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorStep {
    pub step: String,
    pub user_id: UserId,
}

/// Login response body
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    TwoFactor(TwoFactorStep),
    Authenticated(User),
}

/// Second-step request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTwoFactorRequest {
    pub user_id: UserId,
    pub code: String,
}

/// Account summary returned after verification
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

/// Second-step response
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyTwoFactorResponse {
    pub success: bool,
    pub user: SessionUser,
}

/// Password change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Session cookie carrying `token` for `lifetime`
pub fn session_cookie(token: String, lifetime: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(lifetime.num_seconds()))
        .path("/")
        .build()
}

/// Cookie that makes the browser drop the session immediately
pub fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .path("/")
        .build()
}

/// Log in with username and password.
///
/// # Request Body
///
/// ```json
/// {
///   "username": "kagawad",
///   "password": "SecurePass123"
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: user object plus `Set-Cookie: jwt=..`, or `{"step": "2fa", "userId": 7}`
/// - **400 Bad Request**: `INVALID_CREDENTIALS`, with no cookie
/// - **429 Too Many Requests**: username locked after repeated failures
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    match state.auth_manager.authenticate(&payload).await {
        Ok(LoginOutcome::Authenticated { user, token }) => {
            metrics::login_attempts_total("success");
            tracing::info!(user_id = user.id, "Login succeeded");
            let cookie = session_cookie(
                token,
                state.auth_manager.session_duration(),
                state.cookie_secure,
            );
            Ok((jar.add(cookie), Json(LoginResponse::Authenticated(user))))
        }
        Ok(LoginOutcome::TwoFactorRequired { user_id }) => {
            metrics::login_attempts_total("two_factor");
            Ok((
                jar,
                Json(LoginResponse::TwoFactor(TwoFactorStep {
                    step: "2fa".to_string(),
                    user_id,
                })),
            ))
        }
        Err(err) => {
            let outcome = match err {
                AuthError::TooManyAttempts { .. } => "locked",
                ref e if e.is_invalid_credentials() => "failure",
                _ => "error",
            };
            metrics::login_attempts_total(outcome);
            if outcome != "error" {
                logging::log_security_event(
                    "failed_login",
                    None,
                    &format!("Login for '{}' rejected: {}", payload.username, err),
                );
            }
            Err(err.into())
        }
    }
}

/// Redeem a one-time code and start the session.
///
/// # Request Body
///
/// ```json
/// { "userId": 7, "code": "042137" }
/// ```
///
/// # Response
///
/// - **200 OK**: `{"success": true, "user": {id, username, role}}` plus the session cookie
/// - **400 Bad Request**: `CHALLENGE_NOT_FOUND`, `CHALLENGE_EXPIRED` or `CHALLENGE_MISMATCH`
/// - **429 Too Many Requests**: too many wrong codes
pub async fn verify_two_factor(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<VerifyTwoFactorRequest>,
) -> ApiResult<(CookieJar, Json<VerifyTwoFactorResponse>)> {
    let result = state
        .auth_manager
        .verify_challenge(payload.user_id, &payload.code)
        .await;

    let (user, token) = match result {
        Ok(verified) => verified,
        Err(err) => {
            let outcome = match err {
                AuthError::ChallengeNotFound => "not_found",
                AuthError::ChallengeExpired => "expired",
                AuthError::ChallengeMismatch => "mismatch",
                AuthError::TooManyAttempts { .. } => "locked",
                _ => "error",
            };
            metrics::two_factor_verifications_total(outcome);
            if matches!(outcome, "mismatch" | "locked") {
                logging::log_security_event(
                    "failed_two_factor",
                    Some(payload.user_id),
                    &err.to_string(),
                );
            }
            return Err(err.into());
        }
    };

    metrics::two_factor_verifications_total("success");
    let cookie = session_cookie(
        token,
        state.auth_manager.session_duration(),
        state.cookie_secure,
    );
    Ok((
        jar.add(cookie),
        Json(VerifyTwoFactorResponse {
            success: true,
            user: SessionUser {
                id: user.id,
                username: user.username,
                role: user.role,
            },
        }),
    ))
}

/// The signed-in account
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// Clear the session cookie.
///
/// Tokens are stateless, so this only tells the browser to forget it.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(cleared_session_cookie(state.cookie_secure)),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Create an account.
///
/// With an empty user table this bootstraps the head-admin and needs no
/// session. Afterwards only the head-admin may call it.
///
/// # Response
///
/// - **201 Created**: the new user
/// - **400 Bad Request**: username or password rules not met
/// - **401 / 403**: no session, or the caller is not the head-admin
/// - **409 Conflict**: username taken
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let requester = optional_session(&state, &jar).await?;
    let user = state
        .auth_manager
        .register(payload, requester.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Change the caller's own password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .auth_manager
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}
