//! Failed-attempt throttling for login and one-time code verification.

use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Rate limit configuration for one kind of attempt
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Failed attempts allowed within the window before locking
    pub max_attempts: u32,

    /// Time window in seconds, counted from the first failure
    pub window_secs: u64,

    /// Lockout duration in seconds after exceeding the limit
    pub lockout_secs: u64,
}

impl RateLimitConfig {
    /// Password attempts per username
    pub fn login() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 300,
            lockout_secs: 900,
        }
    }

    /// One-time code attempts per user
    pub fn two_factor() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 300,
            lockout_secs: 300,
        }
    }
}

/// Failure record for one identifier
#[derive(Debug, Clone)]
struct FailureWindow {
    failures: u32,
    window_start: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Action is allowed
    Allowed { remaining: u32 },

    /// Action is blocked until the lockout ends
    Locked { retry_after: i64 },
}

impl RateLimitResult {
    /// Check if action is allowed
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Get retry after seconds (if locked)
    pub fn retry_after(&self) -> Option<i64> {
        match self {
            RateLimitResult::Locked { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// In-memory limiter counting failures per identifier.
///
/// State is process-local: a restart forgets all lockouts.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    cache: Arc<RwLock<HashMap<String, FailureWindow>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check whether `identifier` may attempt now, without recording anything
    pub async fn check(&self, identifier: &str) -> RateLimitResult {
        self.check_at(identifier, Utc::now()).await
    }

    async fn check_at(&self, identifier: &str, now: DateTime<Utc>) -> RateLimitResult {
        let cache = self.cache.read().await;
        match cache.get(identifier) {
            Some(window) => self.evaluate(window, now),
            None => RateLimitResult::Allowed {
                remaining: self.config.max_attempts,
            },
        }
    }

    /// Record a failed attempt and return the resulting state
    pub async fn record_failure(&self, identifier: &str) -> RateLimitResult {
        self.record_failure_at(identifier, Utc::now()).await
    }

    async fn record_failure_at(&self, identifier: &str, now: DateTime<Utc>) -> RateLimitResult {
        let window_len = Duration::seconds(self.config.window_secs as i64);

        let mut cache = self.cache.write().await;
        self.prune(&mut cache, now);
        let window = cache
            .entry(identifier.to_string())
            .or_insert_with(|| FailureWindow {
                failures: 0,
                window_start: now,
                locked_until: None,
            });

        // A finished lockout or a stale window starts over
        let lock_over = window.locked_until.is_some_and(|until| now >= until);
        if lock_over || now - window.window_start > window_len {
            window.failures = 0;
            window.window_start = now;
            window.locked_until = None;
        }

        if window.locked_until.is_none() {
            window.failures += 1;
            if window.failures >= self.config.max_attempts {
                let until = now + Duration::seconds(self.config.lockout_secs as i64);
                window.locked_until = Some(until);
                log::warn!(
                    "Locking '{}' for {}s after {} failures",
                    identifier,
                    self.config.lockout_secs,
                    window.failures
                );
            }
        }

        self.evaluate(window, now)
    }

    /// Forget all failures for `identifier`
    pub async fn reset(&self, identifier: &str) {
        self.cache.write().await.remove(identifier);
    }

    /// Drop records whose lockout has ended or whose window has passed.
    ///
    /// Also runs on every recorded failure, so the map only holds
    /// identifiers that failed recently.
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now()).await
    }

    async fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut cache = self.cache.write().await;
        self.prune(&mut cache, now)
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.cache.read().await.len()
    }

    fn prune(&self, cache: &mut HashMap<String, FailureWindow>, now: DateTime<Utc>) -> usize {
        let window_len = Duration::seconds(self.config.window_secs as i64);
        let before = cache.len();
        cache.retain(|_, window| match window.locked_until {
            Some(until) => now < until,
            None => now - window.window_start <= window_len,
        });
        before - cache.len()
    }

    fn evaluate(&self, window: &FailureWindow, now: DateTime<Utc>) -> RateLimitResult {
        if let Some(until) = window.locked_until
            && now < until
        {
            return RateLimitResult::Locked {
                retry_after: (until - now).num_seconds().max(1),
            };
        }

        let window_len = Duration::seconds(self.config.window_secs as i64);
        let failures = if window.locked_until.is_some() || now - window.window_start > window_len
        {
            0
        } else {
            window.failures
        };

        RateLimitResult::Allowed {
            remaining: self.config.max_attempts.saturating_sub(failures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_attempts,
            window_secs: 60,
            lockout_secs: 120,
        })
    }

    #[tokio::test]
    async fn test_locks_after_max_failures() {
        let limiter = limiter(3);
        let now = Utc::now();

        assert_eq!(
            limiter.record_failure_at("u1", now).await,
            RateLimitResult::Allowed { remaining: 2 }
        );
        assert_eq!(
            limiter.record_failure_at("u1", now).await,
            RateLimitResult::Allowed { remaining: 1 }
        );
        let locked = limiter.record_failure_at("u1", now).await;
        assert_eq!(locked.retry_after(), Some(120));
        assert!(!limiter.check_at("u1", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let limiter = limiter(1);
        let now = Utc::now();

        limiter.record_failure_at("u1", now).await;
        assert!(!limiter.check_at("u1", now).await.is_allowed());
        assert!(limiter.check_at("u2", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_lockout_expires() {
        let limiter = limiter(1);
        let now = Utc::now();

        limiter.record_failure_at("u1", now).await;
        let later = now + Duration::seconds(121);
        assert_eq!(
            limiter.check_at("u1", later).await,
            RateLimitResult::Allowed { remaining: 1 }
        );
    }

    #[tokio::test]
    async fn test_window_expiry_forgets_failures() {
        let limiter = limiter(3);
        let now = Utc::now();

        limiter.record_failure_at("u1", now).await;
        limiter.record_failure_at("u1", now).await;
        let later = now + Duration::seconds(61);
        assert_eq!(
            limiter.record_failure_at("u1", later).await,
            RateLimitResult::Allowed { remaining: 2 }
        );
    }

    #[tokio::test]
    async fn test_reset_clears_lock() {
        let limiter = limiter(1);
        limiter.record_failure("u1").await;
        assert!(!limiter.check("u1").await.is_allowed());

        limiter.reset("u1").await;
        assert!(limiter.check("u1").await.is_allowed());
    }

    #[tokio::test]
    async fn test_failures_for_many_identifiers_do_not_accumulate() {
        let limiter = limiter(5);
        let now = Utc::now();

        for i in 0..500 {
            limiter.record_failure_at(&format!("login:ghost{i}"), now).await;
        }
        assert_eq!(limiter.tracked().await, 500);

        let later = now + Duration::days(30);
        limiter.record_failure_at("login:ghost-late", later).await;
        assert_eq!(limiter.tracked().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_active_lockouts() {
        let limiter = limiter(1);
        let now = Utc::now();

        limiter.record_failure_at("locked", now).await;
        assert_eq!(limiter.cleanup_expired_at(now + Duration::seconds(90)).await, 0);
        assert!(!limiter.check_at("locked", now + Duration::seconds(90)).await.is_allowed());

        assert_eq!(limiter.cleanup_expired_at(now + Duration::seconds(121)).await, 1);
        assert_eq!(limiter.tracked().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_windows() {
        let limiter = limiter(3);
        let now = Utc::now();

        limiter.record_failure_at("u1", now).await;
        limiter.record_failure_at("u2", now + Duration::seconds(50)).await;

        assert_eq!(limiter.cleanup_expired_at(now + Duration::seconds(61)).await, 1);
        assert_eq!(
            limiter.check_at("u2", now + Duration::seconds(61)).await,
            RateLimitResult::Allowed { remaining: 2 }
        );
    }
}
