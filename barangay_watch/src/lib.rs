//! # Barangay Watch
//!
//! Backend core for a barangay crime-reporting dashboard.
//!
//! Officials file and edit incident reports, the head-admin manages accounts
//! and reviews the audit trail, and the public submits anonymous tips.
//!
//! ## Core Modules
//!
//! - [`auth`]: Accounts, password login, one-time codes, session tokens, role policy
//! - [`reports`]: Crime reports and their validation
//! - [`audit`]: Field-level change tracking and the append-only audit log
//! - [`tips`]: Public crime tips
//! - [`settings`]: Feature flags behind an explicit interface
//! - [`db`]: Repository traits with PostgreSQL and in-memory implementations
//! - [`security`]: Failed-attempt throttling
//!
//! ## Example
//!
//! ```
//! use barangay_watch::audit::{REPORT_FIELDS, diff};
//! use barangay_watch::reports::{CaseStatus, ReportDetails};
//! use chrono::NaiveDate;
//!
//! let before = ReportDetails {
//!     blotter_no: "2024-001".into(),
//!     barangay: "San Isidro".into(),
//!     offense: "Theft".into(),
//!     date_reported: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
//!     time_reported: None,
//!     date_committed: None,
//!     time_committed: None,
//!     victim: Default::default(),
//!     suspect: Default::default(),
//!     narrative: None,
//!     status: CaseStatus::Unsolved,
//!     location: None,
//! };
//! let mut after = before.clone();
//! after.status = CaseStatus::Solved;
//!
//! let changes = diff(REPORT_FIELDS, &before, &after);
//! assert_eq!(changes[0].field, "status");
//! ```

pub mod audit;
pub mod auth;
pub mod db;
pub mod reports;
pub mod security;
pub mod settings;
pub mod tips;

pub use audit::AuditLogger;
pub use auth::AuthManager;
pub use reports::ReportManager;
pub use settings::SettingsService;
pub use tips::TipManager;
