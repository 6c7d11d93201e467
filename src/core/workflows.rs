// src/core/workflows.rs

//! End-to-end dashboard operations: fetch a dashboard from a [`DashboardStore`], run a
//! reconciler pass over it, and write the result back with a single save.

use crate::{
    core::{
        catalog::QueryCatalog,
        events::Observer,
        reconciler::{
            DescriptionReport, ExportReport, Hierarchy, ReconcileError, Reconciler, SyncReport,
        },
    },
    models::{DashboardSavePayload, DashboardWithMeta},
};
use std::path::Path;

/// Where dashboards are read from and written back to.
pub trait DashboardStore {
    fn fetch_dashboard(&self, uid: &str) -> anyhow::Result<DashboardWithMeta>;
    fn save_dashboard(&self, payload: &DashboardSavePayload) -> anyhow::Result<()>;
}

/// Flags of an export run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Replace query files that already exist.
    pub overwrite: bool,
    /// Generate a query path for panels without one.
    pub generate_missing: bool,
    /// Report what would be written without writing.
    pub dry_run: bool,
}

/// Loads the catalog at `queries_dir`, rewrites the dashboard's targets from it and
/// saves the dashboard once. Nothing is saved on a dry run.
pub fn sync(
    store: &dyn DashboardStore,
    observer: &dyn Observer,
    uid: &str,
    queries_dir: &Path,
    dry_run: bool,
) -> Result<SyncReport, ReconcileError> {
    let catalog = QueryCatalog::load(queries_dir)?;
    let mut full = store.fetch_dashboard(uid)?;

    let report = Reconciler::new(observer).sync_dashboard(&mut full.dashboard, &catalog);
    log::debug!("sync of '{uid}': {report:?}");

    if !dry_run {
        store.save_dashboard(&full.save_payload())?;
    }
    Ok(report)
}

/// Writes the dashboard's queries to `<queries_dir>/queries/`. Aborts before writing
/// anything if two panels share a query path.
pub fn export(
    store: &dyn DashboardStore,
    observer: &dyn Observer,
    uid: &str,
    queries_dir: &Path,
    options: ExportOptions,
) -> Result<ExportReport, ReconcileError> {
    let full = store.fetch_dashboard(uid)?;
    let hierarchy = hierarchy_of(&full);

    let reconciler = Reconciler::new(observer);
    let plan = reconciler.plan_export(&full.dashboard, &hierarchy, options.generate_missing)?;
    log::debug!(
        "export of '{uid}': {} files planned, {} panels skipped, {} empty targets",
        plan.files.len(),
        plan.panels_skipped,
        plan.targets_empty
    );
    reconciler.write_export(&plan, queries_dir, options.overwrite, options.dry_run)
}

/// Regenerates panel descriptions from the folder/dashboard/row hierarchy. The
/// dashboard is saved only when something changed and this is not a dry run.
pub fn update_descriptions(
    store: &dyn DashboardStore,
    observer: &dyn Observer,
    uid: &str,
    overwrite: bool,
    dry_run: bool,
) -> Result<DescriptionReport, ReconcileError> {
    let mut full = store.fetch_dashboard(uid)?;
    if full.title().is_empty() {
        return Err(ReconcileError::MissingDashboardTitle {
            uid: uid.to_string(),
        });
    }

    let hierarchy = hierarchy_of(&full);
    log::info!(
        "processing dashboard: {} in folder: {} (overwrite: {overwrite}, dry run: {dry_run})",
        hierarchy.dashboard_title,
        hierarchy.folder_title
    );

    let report = Reconciler::new(observer).update_descriptions(
        &mut full.dashboard,
        &hierarchy,
        overwrite,
        dry_run,
    );

    if !dry_run && report.panels_updated > 0 {
        store.save_dashboard(&full.save_payload())?;
    }
    Ok(report)
}

fn hierarchy_of(full: &DashboardWithMeta) -> Hierarchy {
    Hierarchy {
        folder_title: full.folder_title().to_string(),
        dashboard_title: full.title().to_string(),
    }
}
