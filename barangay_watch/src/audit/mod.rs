//! Report change tracking and the append-only audit log.

pub mod changes;
pub mod logger;
pub mod models;

pub use changes::{EMPTY_VALUE, Field, REPORT_FIELDS, diff, diff_reports};
pub use logger::{AuditLogger, MAX_PAGE_SIZE};
pub use models::{AuditAction, AuditLogEntry, AuditLogId, FieldChange, NewAuditLogEntry};
