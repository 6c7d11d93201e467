//! Reconciles Grafana dashboards with query files kept under version control, and
//! backs whole servers up to local disk or object storage.

/// Argument parsing and command handlers.
pub mod cli;
/// File names, extensions and environment variables.
pub mod constants;
pub mod core;
/// Typed Grafana API payloads.
pub mod models;
/// Per-run context shared by handlers.
pub mod state;
pub mod system;
