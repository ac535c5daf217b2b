//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User ID type
pub type UserId = i64;

/// Account role.
///
/// `HeadAdmin` is the single bootstrap account: it cannot be deleted and is
/// never asked for a second factor. `Admin` accounts are the barangay
/// officials who log and edit reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "head-admin")]
    HeadAdmin,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::HeadAdmin => "head-admin",
            Role::Admin => "admin",
        }
    }

    /// Whether this role skips the second login factor
    pub fn bypasses_two_factor(&self) -> bool {
        matches!(self, Role::HeadAdmin)
    }

    /// Whether this role is an official allowed to create and edit reports
    pub fn is_official(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head-admin" => Ok(Role::HeadAdmin),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Outstanding one-time code attached to a user.
///
/// Code and expiry travel together so one can never be stored without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoFactorChallenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl TwoFactorChallenge {
    /// Whether the challenge can no longer be redeemed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// User model, never carrying the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub email: Option<String>,
    #[serde(rename = "enableTwoFA")]
    pub enable_two_fa: bool,
    #[serde(skip)]
    pub two_factor: Option<TwoFactorChallenge>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether login for this account must go through a one-time code
    pub fn requires_two_factor(&self) -> bool {
        self.enable_two_fa && !self.role.bypasses_two_factor()
    }
}

/// Stored credentials: the user plus its password hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Data needed to insert a user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub email: Option<String>,
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Result of a successful password check.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Session issued right away
    Authenticated { user: User, token: String },
    /// A one-time code was issued; no session yet
    TwoFactorRequired { user_id: UserId },
}

/// JWT claims for the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub exp: i64,
    pub iat: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(role: Role, enable_two_fa: bool) -> User {
        User {
            id: 1,
            username: "kagawad".to_string(),
            role,
            email: None,
            enable_two_fa,
            two_factor: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::HeadAdmin, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("official".parse::<Role>().is_err());
    }

    #[test]
    fn test_head_admin_never_requires_two_factor() {
        assert!(!user(Role::HeadAdmin, true).requires_two_factor());
        assert!(user(Role::Admin, true).requires_two_factor());
        assert!(!user(Role::Admin, false).requires_two_factor());
    }

    #[test]
    fn test_challenge_expiry_boundary() {
        let now = Utc::now();
        let challenge = TwoFactorChallenge {
            code: "012345".to_string(),
            expires_at: now,
        };
        assert!(!challenge.is_expired_at(now));
        assert!(challenge.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_user_json_hides_challenge() {
        let mut u = user(Role::Admin, true);
        u.two_factor = Some(TwoFactorChallenge {
            code: "999999".to_string(),
            expires_at: Utc::now(),
        });
        let json = serde_json::to_value(&u).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["enableTwoFA"], true);
        assert!(!json.to_string().contains("999999"));
        assert!(json.get("passwordHash").is_none());
    }
}
