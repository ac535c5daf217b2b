//! HTTP server for the barangay crime-report dashboard.
//!
//! Exposed as a library so integration tests can build the router over
//! in-memory storage.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
