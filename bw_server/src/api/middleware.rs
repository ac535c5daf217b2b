//! Session middleware for protected endpoints.
//!
//! The session token travels in the HTTP-only `jwt` cookie. The middleware
//! resolves it to a live account and stores a [`CurrentUser`] in the request
//! extensions for downstream handlers.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use bw_server::api::middleware::{CurrentUser, require_session};
//! # use bw_server::api::AppState;
//! # let state: AppState = unimplemented!();
//!
//! async fn whoami(CurrentUser(user): CurrentUser) -> String {
//!     format!("Authenticated as {}", user.username)
//! }
//!
//! let protected: Router<AppState> = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(state, require_session));
//! # let _ = protected;
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use barangay_watch::auth::{AuthError, User};

use super::{AppState, error::ApiError};
use crate::logging;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "jwt";

/// The account behind the request's session cookie
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolve the session cookie or reject with 401.
///
/// - **Missing cookie**: `UNAUTHENTICATED`
/// - **Bad signature or expired**: `INVALID_TOKEN`
/// - **Account deleted since login**: `UNAUTHENTICATED`
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_session(&state, &jar).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Resolve the session cookie if one was sent
///
/// Used by routes that are public but behave differently for a signed-in
/// caller. A cookie that is present but invalid is still an error.
pub async fn optional_session(state: &AppState, jar: &CookieJar) -> Result<Option<User>, ApiError> {
    if jar.get(SESSION_COOKIE).is_none() {
        return Ok(None);
    }
    resolve_session(state, jar).await.map(Some)
}

async fn resolve_session(state: &AppState, jar: &CookieJar) -> Result<User, ApiError> {
    let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value());
    state.auth_manager.resolve(token).await.map_err(|err| {
        if matches!(err, AuthError::InvalidToken(_) | AuthError::StaleSession) {
            logging::log_security_event("rejected_session", None, &err.to_string());
        }
        ApiError::from(err)
    })
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::Auth(AuthError::Unauthenticated))
    }
}
