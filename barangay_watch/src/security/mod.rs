//! Security helpers: failed-attempt throttling.
//!
//! Two limiters guard the login flow:
//! - **Login**: 5 wrong passwords per username in 5 minutes, 15-minute lockout
//! - **Two-factor**: 5 wrong codes per user in 5 minutes, 5-minute lockout
//!
//! ## Example
//!
//! ```
//! use barangay_watch::security::{RateLimitConfig, RateLimiter};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let limiter = RateLimiter::new(RateLimitConfig::two_factor());
//! let result = limiter.record_failure("user:7").await;
//! assert!(result.is_allowed());
//! # }
//! ```

pub mod rate_limiter;

pub use rate_limiter::{RateLimitConfig, RateLimitResult, RateLimiter};
