//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use barangay_watch::{
    auth::AuthSettings,
    db::DatabaseConfig,
    security::RateLimitConfig,
};
use chrono::Duration;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
};

const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; `None` runs on in-memory storage
    pub database: Option<DatabaseConfig>,
    /// Security configuration
    pub security: SecurityConfig,
    /// Session lifetime and attempt throttles
    pub auth: AuthSettings,
    /// Persist audit entries for updates that changed nothing
    pub audit_log_empty_updates: bool,
    /// Set the `Secure` attribute on the session cookie
    pub cookie_secure: bool,
    /// Prometheus exporter listener
    pub metrics_bind: Option<SocketAddr>,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(bind_override, database_url_override, |key| {
            std::env::var(key).ok()
        })
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_or(&lookup, "SERVER_BIND", DEFAULT_BIND)?,
        };

        let database_url = database_url_override.or_else(|| lookup("DATABASE_URL"));
        let database = DatabaseConfig::from_lookup(|key| match key {
            "DATABASE_URL" => database_url.clone(),
            _ => lookup(key),
        });

        // Security configuration (REQUIRED)
        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper =
            lookup("PASSWORD_PEPPER").ok_or_else(|| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        let defaults = AuthSettings::default();
        let login_defaults = RateLimitConfig::login();
        let two_fa_defaults = RateLimitConfig::two_factor();

        let session_days: i64 = positive(&lookup, "SESSION_TTL_DAYS", 14)?;
        let code_ttl_secs: i64 = positive(
            &lookup,
            "TWO_FA_CODE_TTL_SECS",
            defaults.challenge_ttl.num_seconds(),
        )?;

        let auth = AuthSettings {
            session_duration: Duration::days(session_days),
            challenge_ttl: Duration::seconds(code_ttl_secs),
            login_limit: RateLimitConfig {
                max_attempts: positive(&lookup, "LOGIN_MAX_ATTEMPTS", login_defaults.max_attempts)?,
                lockout_secs: positive(&lookup, "LOGIN_LOCKOUT_SECS", login_defaults.lockout_secs)?,
                ..login_defaults
            },
            two_factor_limit: RateLimitConfig {
                max_attempts: positive(
                    &lookup,
                    "TWO_FA_MAX_ATTEMPTS",
                    two_fa_defaults.max_attempts,
                )?,
                lockout_secs: positive(
                    &lookup,
                    "TWO_FA_LOCKOUT_SECS",
                    two_fa_defaults.lockout_secs,
                )?,
                ..two_fa_defaults
            },
        };

        let metrics_bind = match lookup("METRICS_BIND") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{raw}' is not a socket address"),
            })?),
            None => None,
        };

        Ok(Self {
            bind,
            database,
            security: SecurityConfig {
                jwt_secret,
                password_pepper,
            },
            auth,
            audit_log_empty_updates: parse_bool_or(&lookup, "AUDIT_LOG_EMPTY_UPDATES", true)?,
            cookie_secure: parse_bool_or(&lookup, "COOKIE_SECURE", true)?,
            metrics_bind,
        })
    }
}

/// Parse a variable, falling back to `default` when unset
fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("could not parse '{raw}'"),
        }),
        None => Ok(default),
    }
}

/// Like [`parse_or`] but rejects zero and negative values
fn positive<T: FromStr + PartialOrd + Default>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError> {
    let value = parse_or(lookup, var, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            var: var.to_string(),
            reason: "Must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(var).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("'{raw}' is not a boolean"),
            }),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const PEPPER: &str = "fedcba9876543210";

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(None, None, |key| vars.get(key).cloned())
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![("JWT_SECRET", SECRET), ("PASSWORD_PEPPER", PEPPER)]
    }

    #[test]
    fn test_defaults() {
        let config = load(&required()).unwrap();
        assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
        assert!(config.database.is_none());
        assert_eq!(config.auth.session_duration, Duration::days(14));
        assert_eq!(config.auth.challenge_ttl, Duration::seconds(300));
        assert_eq!(config.auth.login_limit.lockout_secs, 900);
        assert_eq!(config.auth.two_factor_limit.max_attempts, 5);
        assert!(config.audit_log_empty_updates);
        assert!(config.cookie_secure);
        assert!(config.metrics_bind.is_none());
    }

    #[test]
    fn test_missing_jwt_secret() {
        let err = load(&[("PASSWORD_PEPPER", PEPPER)]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref var, .. } if var == "JWT_SECRET"));
    }

    #[test]
    fn test_short_secrets_rejected() {
        let err = load(&[("JWT_SECRET", "short"), ("PASSWORD_PEPPER", PEPPER)]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "JWT_SECRET"));

        let err = load(&[("JWT_SECRET", SECRET), ("PASSWORD_PEPPER", "short")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "PASSWORD_PEPPER"));
    }

    #[test]
    fn test_overrides_and_tunables() {
        let mut vars = required();
        vars.extend([
            ("DATABASE_URL", "postgres://localhost/bw"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("SESSION_TTL_DAYS", "7"),
            ("TWO_FA_CODE_TTL_SECS", "120"),
            ("LOGIN_MAX_ATTEMPTS", "3"),
            ("AUDIT_LOG_EMPTY_UPDATES", "false"),
            ("COOKIE_SECURE", "0"),
            ("METRICS_BIND", "127.0.0.1:9100"),
        ]);
        let config = load(&vars).unwrap();

        let database = config.database.unwrap();
        assert_eq!(database.database_url, "postgres://localhost/bw");
        assert_eq!(database.max_connections, 4);
        assert_eq!(config.auth.session_duration, Duration::days(7));
        assert_eq!(config.auth.challenge_ttl, Duration::seconds(120));
        assert_eq!(config.auth.login_limit.max_attempts, 3);
        assert!(!config.audit_log_empty_updates);
        assert!(!config.cookie_secure);
        assert_eq!(config.metrics_bind.unwrap().port(), 9100);
    }

    #[test]
    fn test_cli_database_url_wins() {
        let vars: HashMap<&str, &str> = required().into_iter().collect();
        let config = ServerConfig::from_lookup(
            Some("0.0.0.0:3000".parse().unwrap()),
            Some("postgres://cli/bw".to_string()),
            |key| vars.get(key).map(|v| v.to_string()),
        )
        .unwrap();
        assert_eq!(config.bind.port(), 3000);
        assert_eq!(config.database.unwrap().database_url, "postgres://cli/bw");
    }

    #[test]
    fn test_invalid_values_are_errors() {
        for (var, value) in [
            ("SERVER_BIND", "not-an-address"),
            ("SESSION_TTL_DAYS", "0"),
            ("TWO_FA_MAX_ATTEMPTS", "many"),
            ("COOKIE_SECURE", "maybe"),
        ] {
            let mut vars = required();
            vars.push((var, value));
            let err = load(&vars).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { var: ref v, .. } if v == var),
                "{var}"
            );
        }
    }
}
