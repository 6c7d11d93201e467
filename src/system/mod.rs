//! # System Interaction Layer
//!
//! Everything that leaves the process: the Grafana HTTP API, backup destinations
//! and the archive format.
//!
//! ## Modules
//!
//! - **`grafana`**: blocking API client. Also the [`DashboardStore`] used by the
//!   reconciliation workflows.
//! - **`backup_store`**: where backup archives go (a local directory or a Cloud
//!   Storage bucket) and where imports read them from.
//! - **`archive`**: gzip framing of archives.
//! - **`backup`**: collects and restores a full server.
//!
//! [`DashboardStore`]: crate::core::workflows::DashboardStore

pub mod archive;
pub mod backup;
pub mod backup_store;
pub mod grafana;
