//! Authentication module: accounts, login with an optional second factor,
//! and stateless session tokens.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - HS256 JWT session tokens (14-day expiry), carried in an HTTP-only cookie
//! - Six-digit one-time login codes (5-minute expiry, single use)
//! - Attempt throttling for passwords and codes
//! - A single role policy ([`policy::can_perform`]) for every gated operation
//!
//! ## Example
//!
//! ```no_run
//! use barangay_watch::auth::{AuthManager, LoginOutcome, LoginRequest, RegisterRequest};
//! use barangay_watch::db::InMemoryUserRepository;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = AuthManager::new(
//!         Arc::new(InMemoryUserRepository::new()),
//!         "secret_pepper_value".to_string(),
//!         "jwt_secret_at_least_32_characters_long".to_string(),
//!     );
//!
//!     // The first account becomes the head-admin
//!     let request = RegisterRequest {
//!         username: "captain".to_string(),
//!         password: "SecurePass123".to_string(),
//!         email: None,
//!     };
//!     auth.register(request, None).await?;
//!
//!     let login = LoginRequest {
//!         username: "captain".to_string(),
//!         password: "SecurePass123".to_string(),
//!     };
//!     if let LoginOutcome::Authenticated { user, .. } = auth.authenticate(&login).await? {
//!         println!("Logged in as {}", user.username);
//!     }
//!     Ok(())
//! }
//! ```

pub mod delivery;
pub mod errors;
pub mod manager;
pub mod models;
pub mod policy;

pub use delivery::{ChallengeDelivery, LogDelivery};
pub use errors::{AuthError, AuthResult};
pub use manager::{AuthManager, AuthSettings};
pub use models::{
    LoginOutcome, LoginRequest, NewUser, RegisterRequest, Role, SessionClaims,
    TwoFactorChallenge, User, UserCredentials, UserId,
};
pub use policy::{Action, authorize, can_perform};
