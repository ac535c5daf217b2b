//! Crime reports filed by barangay officials.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{ReportError, ReportResult};
pub use manager::ReportManager;
pub use models::{
    CaseStatus, Gender, HarmStatus, Location, MAX_AGE, Report, ReportDetails, ReportId, Suspect,
    SuspectStatus, Victim,
};
