//! Authentication manager implementation.

use super::{
    delivery::{ChallengeDelivery, LogDelivery},
    errors::{AuthError, AuthResult},
    models::{
        LoginOutcome, LoginRequest, NewUser, RegisterRequest, Role, SessionClaims,
        TwoFactorChallenge, User, UserId,
    },
    policy::{self, Action},
};
use crate::db::UserRepository;
use crate::security::{RateLimitConfig, RateLimiter};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Tunable lifetimes and throttles
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Lifetime of a session token
    pub session_duration: Duration,
    /// Lifetime of a one-time login code
    pub challenge_ttl: Duration,
    /// Wrong passwords per username
    pub login_limit: RateLimitConfig,
    /// Wrong codes per user
    pub two_factor_limit: RateLimitConfig,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_duration: Duration::days(14),
            challenge_ttl: Duration::minutes(5),
            login_limit: RateLimitConfig::login(),
            two_factor_limit: RateLimitConfig::two_factor(),
        }
    }
}

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    delivery: Arc<dyn ChallengeDelivery>,
    pepper: String,
    jwt_secret: String,
    session_duration: Duration,
    challenge_ttl: Duration,
    login_limiter: RateLimiter,
    challenge_limiter: RateLimiter,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - Account storage
    /// * `pepper` - Server-side pepper for password hashing
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(users: Arc<dyn UserRepository>, pepper: String, jwt_secret: String) -> Self {
        Self::with_settings(users, pepper, jwt_secret, AuthSettings::default())
    }

    /// Create a manager with explicit lifetimes and throttles
    pub fn with_settings(
        users: Arc<dyn UserRepository>,
        pepper: String,
        jwt_secret: String,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            delivery: Arc::new(LogDelivery),
            pepper,
            jwt_secret,
            session_duration: settings.session_duration,
            challenge_ttl: settings.challenge_ttl,
            login_limiter: RateLimiter::new(settings.login_limit),
            challenge_limiter: RateLimiter::new(settings.two_factor_limit),
        }
    }

    /// Replace the one-time code transport
    pub fn with_delivery(mut self, delivery: Arc<dyn ChallengeDelivery>) -> Self {
        self.delivery = delivery;
        self
    }

    /// Lifetime of issued session tokens
    pub fn session_duration(&self) -> Duration {
        self.session_duration
    }

    /// Create an account.
    ///
    /// The first account ever created becomes the head-admin. After that a
    /// head-admin `requester` is required and new accounts are admins with
    /// two-factor off.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidUsername` - Username format invalid
    /// * `AuthError::WeakPassword` - Password too weak
    /// * `AuthError::Unauthenticated` - No requester once bootstrapped
    /// * `AuthError::Forbidden` - Requester is not the head-admin
    /// * `AuthError::UsernameTaken` - Username already exists
    pub async fn register(
        &self,
        request: RegisterRequest,
        requester: Option<&User>,
    ) -> AuthResult<User> {
        Self::validate_username(&request.username)?;
        Self::validate_password(&request.password)?;

        let role = if self.users.count().await? == 0 {
            Role::HeadAdmin
        } else {
            let requester = requester.ok_or(AuthError::Unauthenticated)?;
            policy::authorize(requester, Action::CreateAdmin)?;
            Role::Admin
        };

        let password_hash = self.hash_password(&request.password)?;
        let email = request
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        let user = self
            .users
            .create(NewUser {
                username: request.username,
                password_hash,
                role,
                email,
            })
            .await?;

        log::info!("Created {} account '{}' ({})", user.role, user.username, user.id);
        Ok(user)
    }

    /// Check a username and password.
    ///
    /// Returns a session right away unless the account needs a second
    /// factor, in which case a fresh code is issued and delivered instead.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` / `AuthError::InvalidPassword` - Bad credentials
    /// * `AuthError::TooManyAttempts` - Username is locked out
    pub async fn authenticate(&self, request: &LoginRequest) -> AuthResult<LoginOutcome> {
        let key = format!("login:{}", request.username);
        if let Some(retry_after_secs) = self.login_limiter.check(&key).await.retry_after() {
            return Err(AuthError::TooManyAttempts { retry_after_secs });
        }

        let checked = match self.users.find_credentials(&request.username).await? {
            Some(creds) => self
                .verify_password(&request.password, &creds.password_hash)
                .map(|()| creds.user),
            None => Err(AuthError::UserNotFound),
        };
        let user = match checked {
            Ok(user) => user,
            Err(e) => {
                self.login_limiter.record_failure(&key).await;
                return Err(e);
            }
        };
        self.login_limiter.reset(&key).await;

        if user.requires_two_factor() {
            self.issue_challenge(user.id).await?;
            return Ok(LoginOutcome::TwoFactorRequired { user_id: user.id });
        }

        let token = self.issue_session_token(user.id)?;
        Ok(LoginOutcome::Authenticated { user, token })
    }

    /// Issue a new one-time code for `user_id`, replacing any outstanding one
    pub async fn issue_challenge(&self, user_id: UserId) -> AuthResult<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::AccountNotFound(user_id))?;

        let challenge = TwoFactorChallenge {
            code: Self::generate_code(),
            expires_at: Utc::now() + self.challenge_ttl,
        };
        self.users
            .store_two_factor_challenge(user_id, &challenge)
            .await?;
        self.challenge_limiter
            .reset(&Self::challenge_key(user_id))
            .await;

        self.delivery.deliver(&user, &challenge.code).await
    }

    /// Redeem a one-time code and start a session.
    ///
    /// A code validates at most once.
    ///
    /// # Errors
    ///
    /// * `AuthError::ChallengeNotFound` - No outstanding code
    /// * `AuthError::ChallengeExpired` - Code is past its expiry
    /// * `AuthError::ChallengeMismatch` - Wrong code
    /// * `AuthError::TooManyAttempts` - Too many wrong codes
    pub async fn verify_challenge(&self, user_id: UserId, code: &str) -> AuthResult<(User, String)> {
        let key = Self::challenge_key(user_id);
        if let Some(retry_after_secs) = self.challenge_limiter.check(&key).await.retry_after() {
            return Err(AuthError::TooManyAttempts { retry_after_secs });
        }

        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::ChallengeNotFound)?;
        let challenge = user
            .two_factor
            .take()
            .ok_or(AuthError::ChallengeNotFound)?;

        if challenge.is_expired_at(Utc::now()) {
            return Err(AuthError::ChallengeExpired);
        }
        if !Self::codes_match(&challenge.code, code) {
            self.challenge_limiter.record_failure(&key).await;
            return Err(AuthError::ChallengeMismatch);
        }

        // Another request may have redeemed or replaced the code meanwhile
        if !self
            .users
            .consume_two_factor_challenge(user_id, &challenge.code)
            .await?
        {
            return Err(AuthError::ChallengeNotFound);
        }
        self.challenge_limiter.reset(&key).await;

        let token = self.issue_session_token(user.id)?;
        Ok((user, token))
    }

    /// Resolve the user behind a session cookie value
    ///
    /// # Errors
    ///
    /// * `AuthError::Unauthenticated` - No token
    /// * `AuthError::InvalidToken` - Bad signature or expired
    /// * `AuthError::StaleSession` - Account no longer exists
    pub async fn resolve(&self, token: Option<&str>) -> AuthResult<User> {
        let token = token.ok_or(AuthError::Unauthenticated)?;
        let claims = self.verify_session_token(token)?;
        self.users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::StaleSession)
    }

    /// Sign a session token for `user_id`
    pub fn issue_session_token(&self, user_id: UserId) -> AuthResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            exp: (now + self.session_duration).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Check signature and expiry of a session token
    pub fn verify_session_token(&self, token: &str) -> AuthResult<SessionClaims> {
        let token_data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Delete an admin account. The head-admin can never be deleted.
    ///
    /// # Errors
    ///
    /// * `AuthError::Forbidden` - Requester is not the head-admin
    /// * `AuthError::AccountNotFound` - No such account
    /// * `AuthError::ProtectedAccount` - Target is the head-admin
    pub async fn delete_admin(&self, requester: &User, target_id: UserId) -> AuthResult<User> {
        policy::authorize(requester, Action::DeleteAdmin)?;

        let target = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or(AuthError::AccountNotFound(target_id))?;
        if target.role == Role::HeadAdmin {
            return Err(AuthError::ProtectedAccount);
        }

        let deleted = self
            .users
            .delete(target_id)
            .await?
            .ok_or(AuthError::AccountNotFound(target_id))?;
        log::info!("User {} deleted account '{}'", requester.id, deleted.username);
        Ok(deleted)
    }

    /// Turn the second login factor on or off for `target_id`.
    ///
    /// The head-admin may set it either way for any account; an official
    /// may only switch it on for themselves.
    pub async fn set_two_factor_requirement(
        &self,
        requester: &User,
        target_id: UserId,
        enabled: bool,
    ) -> AuthResult<User> {
        policy::authorize(
            requester,
            Action::ToggleTwoFactor {
                target: target_id,
                enable: enabled,
            },
        )?;

        let user = self
            .users
            .set_two_factor_enabled(target_id, enabled)
            .await?
            .ok_or(AuthError::AccountNotFound(target_id))?;
        log::info!(
            "User {} set two-factor={} for account {}",
            requester.id,
            enabled,
            target_id
        );
        Ok(user)
    }

    /// All accounts, without password hashes or codes
    pub async fn list_admins(&self, requester: &User) -> AuthResult<Vec<User>> {
        policy::authorize(requester, Action::ListAdmins)?;
        let mut users = self.users.list().await?;
        for user in &mut users {
            user.two_factor = None;
        }
        Ok(users)
    }

    /// Replace the caller's password after checking the current one
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let creds = self
            .users
            .find_credentials_by_id(user.id)
            .await?
            .ok_or(AuthError::StaleSession)?;
        self.verify_password(current_password, &creds.password_hash)?;
        Self::validate_password(new_password)?;

        let password_hash = self.hash_password(new_password)?;
        self.users.set_password_hash(user.id, &password_hash).await
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidPassword)?;
        let argon2 = Argon2::default();

        argon2
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidPassword)
    }

    /// Uniform six-digit code, zero-padded
    fn generate_code() -> String {
        format!("{:06}", rand::rng().random_range(0..1_000_000u32))
    }

    fn codes_match(stored: &str, submitted: &str) -> bool {
        stored.len() == submitted.len() && bool::from(stored.as_bytes().ct_eq(submitted.as_bytes()))
    }

    fn challenge_key(user_id: UserId) -> String {
        format!("2fa:{user_id}")
    }

    /// Validate username format
    fn validate_username(username: &str) -> AuthResult<()> {
        let len = username.chars().count();
        if !(3..=32).contains(&len) {
            return Err(AuthError::InvalidUsername(
                "Username must be 3-32 characters".to_string(),
            ));
        }

        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(AuthError::InvalidUsername(
                "Username can only contain letters, numbers, '_', '.' and '-'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate password strength
    fn validate_password(password: &str) -> AuthResult<()> {
        if password.chars().count() < 8 {
            return Err(AuthError::WeakPassword(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
        let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());

        if !has_digit || !has_uppercase || !has_lowercase {
            return Err(AuthError::WeakPassword(
                "Password must contain at least one number, one uppercase and one lowercase letter"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
