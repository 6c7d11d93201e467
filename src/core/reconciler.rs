// src/core/reconciler.rs

//! # Reconciler
//!
//! Keeps panel targets and the on-disk query catalog in agreement, in both directions:
//!
//! - **sync**: query files are the source of truth and are copied into the targets.
//! - **export**: targets are the source of truth and are written out as query files.
//! - **descriptions**: every query panel gets a canonical `query=<path>` description
//!   derived from its place in the folder/dashboard/row hierarchy.
//!
//! Everything here works on an in-memory dashboard document. Fetching and saving the
//! document is the caller's job (see `core::workflows`), so a failure midway through a
//! walk never leaves a partially updated dashboard on the server.

use crate::{
    constants::QUERIES_SUBDIR,
    core::{
        catalog::{CatalogError, QueryCatalog},
        description::{derive_base_path, is_valid_description, parse_references},
        document::JsonPath,
        events::{Observer, PanelRef, ReconcileEvent},
        panel_walker::{
            flatten_panels, is_query_exempt, locate_panels, panel_at, panel_at_mut,
            PanelPosition,
        },
        path_generator::{generate_description, generate_path, target_query_path},
        rewriter::{export_target, rewrite_target, DatasourceKind, RewriteOutcome},
    },
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// A query path claimed by more than one panel or target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePath {
    /// The contested path.
    pub path: String,
    /// `type:"title"` of every claimant, in traversal order.
    pub panels: Vec<String>,
}

impl fmt::Display for DuplicatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' used by {} panels ({})",
            self.path,
            self.panels.len(),
            self.panels.join(", ")
        )
    }
}

fn join_duplicates(duplicates: &[DuplicatePath]) -> String {
    duplicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures that abort a reconciliation pass.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Export targets would overwrite each other.
    #[error("Found panels sharing the same query path: {}", join_duplicates(.duplicates))]
    DuplicateQueryPaths { duplicates: Vec<DuplicatePath> },

    /// A path cannot be generated for an untitled dashboard.
    #[error("Dashboard '{uid}' has no title")]
    MissingDashboardTitle { uid: String },

    /// A query file could not be written.
    #[error("Failed to write query file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory of the export tree could not be created.
    #[error("Failed to create directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The query directory could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The dashboard could not be saved.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Titles of the containers a dashboard lives in, used to generate query paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    /// Empty for the General folder.
    pub folder_title: String,
    /// Title of the dashboard.
    pub dashboard_title: String,
}

/// Outcome of a sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Panels that carried a query path.
    pub panels_visited: usize,
    /// Targets rewritten from the catalog.
    pub targets_updated: usize,
    /// Targets with no matching query file.
    pub targets_missing: usize,
    /// Targets whose datasource cannot take the query.
    pub targets_unsupported: usize,
}

/// One query file an export would produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Path relative to the `queries/` directory, extension included.
    pub relative_path: String,
    /// Query text to write.
    pub content: String,
    /// Source panel.
    pub panel: PanelRef,
    /// Position of the target in the panel.
    pub target_index: usize,
    /// The target `refId`.
    pub ref_id: String,
}

/// The files an export would write, computed without touching the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportPlan {
    /// Files in traversal order.
    pub files: Vec<ExportFile>,
    /// Panels without a usable query path.
    pub panels_skipped: usize,
    /// Targets without query text.
    pub targets_empty: usize,
    /// Targets whose path would leave the export directory.
    pub targets_rejected: usize,
}

/// Outcome of an export pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Files written, or that would be on a dry run.
    pub files_written: usize,
    /// Existing files left in place.
    pub files_skipped: usize,
}

/// Outcome of a description pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptionReport {
    /// Panels given a new description.
    pub panels_updated: usize,
    /// Panels whose description was kept.
    pub panels_skipped: usize,
}

/// A panel that survived the first export pass.
struct ExportCandidate {
    position: PanelPosition,
    base_path: String,
    references: Vec<String>,
}

/// Runs reconciliation passes, reporting each decision to an observer.
pub struct Reconciler<'a> {
    observer: &'a dyn Observer,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler reporting to `observer`.
    pub fn new(observer: &'a dyn Observer) -> Self {
        Self { observer }
    }

    fn emit(&self, event: ReconcileEvent) {
        self.observer.notify(&event);
    }

    /// Copies catalog queries into the targets of every panel, in place.
    ///
    /// Targets whose query cannot be found, or whose datasource has no rewrite for
    /// the query language, are left as they are.
    pub fn sync_dashboard(&self, dashboard: &mut Value, catalog: &QueryCatalog) -> SyncReport {
        let mut report = SyncReport::default();
        let Some(panels) = dashboard.array_at_mut(&["panels"]) else {
            return report;
        };

        for position in flatten_panels(panels) {
            let Some(panel) = panel_at_mut(panels, position) else {
                continue;
            };
            report.panels_visited += 1;
            if is_query_exempt(panel) {
                continue;
            }
            self.sync_panel(panel, catalog, &mut report);
        }
        report
    }

    fn sync_panel(&self, panel: &mut Value, catalog: &QueryCatalog, report: &mut SyncReport) {
        let panel_ref = PanelRef::of(panel);
        let description = panel.str_at(&["description"]).to_string();
        if description.is_empty() {
            self.emit(ReconcileEvent::PanelWithoutDescription { panel: panel_ref });
            return;
        }
        if panel.array_at(&["targets"]).is_empty() {
            self.emit(ReconcileEvent::PanelWithoutTargets { panel: panel_ref });
            return;
        }

        let base_path = derive_base_path(&description);
        if base_path.is_empty() {
            self.emit(ReconcileEvent::PanelWithoutQueryPath {
                panel: panel_ref,
                description,
            });
            return;
        }

        let references = parse_references(&description);
        let datasource = DatasourceKind::of_panel(panel);
        let Some(targets) = panel.array_at_mut(&["targets"]) else {
            return;
        };

        for (index, target) in targets.iter_mut().enumerate() {
            let ref_id = target.str_at(&["refId"]).to_string();
            let query = references
                .get(index)
                .filter(|_| references.len() > 1)
                .and_then(|reference| catalog.get(reference))
                .or_else(|| catalog.get_by_base_and_ref_id(&base_path, &ref_id));

            let Some(query) = query else {
                report.targets_missing += 1;
                self.emit(ReconcileEvent::QueryNotFound {
                    panel: panel_ref.clone(),
                    target_index: index,
                    ref_id,
                    base_path: base_path.clone(),
                });
                continue;
            };

            match rewrite_target(target, query, &datasource) {
                RewriteOutcome::Applied => {
                    report.targets_updated += 1;
                    self.emit(ReconcileEvent::TargetUpdated {
                        panel: panel_ref.clone(),
                        target_index: index,
                        ref_id,
                        query: query.name.clone(),
                    });
                }
                RewriteOutcome::Unsupported => {
                    report.targets_unsupported += 1;
                    self.emit(ReconcileEvent::UnsupportedRewrite {
                        panel: panel_ref.clone(),
                        target_index: index,
                        query: query.name.clone(),
                        datasource: datasource.as_str().to_string(),
                    });
                }
            }
        }
    }

    /// Works out which query files an export of `dashboard` would write.
    ///
    /// The first pass groups every exportable panel by its base query path and fails
    /// with [`ReconcileError::DuplicateQueryPaths`] if two panels would share one.
    /// Only then does the second pass read the target contents. A plan in which two
    /// targets still resolve to the same file fails the same way.
    pub fn plan_export(
        &self,
        dashboard: &Value,
        hierarchy: &Hierarchy,
        generate_missing: bool,
    ) -> Result<ExportPlan, ReconcileError> {
        let panels = dashboard.array_at(&["panels"]);
        let mut plan = ExportPlan::default();

        // Pass 1: collect base paths.
        let mut candidates = Vec::new();
        let mut claims: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for location in locate_panels(panels) {
            let Some(panel) = panel_at(panels, location.position) else {
                continue;
            };
            if is_query_exempt(panel) {
                continue;
            }

            let panel_ref = PanelRef::of(panel);
            let description = panel.str_at(&["description"]);
            let (base_path, references) = if description.is_empty() {
                if !generate_missing {
                    plan.panels_skipped += 1;
                    self.emit(ReconcileEvent::PanelWithoutDescription { panel: panel_ref });
                    continue;
                }
                let path = generate_path(
                    &hierarchy.folder_title,
                    &hierarchy.dashboard_title,
                    &location.row_title,
                    &panel_ref.panel_type,
                    &panel_ref.title,
                );
                (path, Vec::new())
            } else {
                (derive_base_path(description), parse_references(description))
            };

            if base_path.is_empty() {
                plan.panels_skipped += 1;
                self.emit(ReconcileEvent::PanelWithoutQueryPath {
                    panel: panel_ref,
                    description: description.to_string(),
                });
                continue;
            }

            claims
                .entry(base_path.clone())
                .or_default()
                .push(panel_ref.to_string());
            candidates.push(ExportCandidate {
                position: location.position,
                base_path,
                references,
            });
        }

        self.reject_duplicates(claims)?;

        // Pass 2: resolve one file per target.
        for candidate in candidates {
            let Some(panel) = panel_at(panels, candidate.position) else {
                continue;
            };
            self.plan_panel(panel, &candidate, &mut plan);
        }

        // Per-target references and refId suffixes can still land on one file.
        let mut files: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for file in &plan.files {
            files
                .entry(file.relative_path.clone())
                .or_default()
                .push(format!("{} target[{}]", file.panel, file.target_index));
        }
        self.reject_duplicates(files)?;
        Ok(plan)
    }

    /// Fails with every path claimed more than once, after reporting each of them.
    fn reject_duplicates(
        &self,
        claims: BTreeMap<String, Vec<String>>,
    ) -> Result<(), ReconcileError> {
        let duplicates: Vec<DuplicatePath> = claims
            .into_iter()
            .filter(|(_, panels)| panels.len() > 1)
            .map(|(path, panels)| DuplicatePath { path, panels })
            .collect();
        if duplicates.is_empty() {
            return Ok(());
        }
        for duplicate in &duplicates {
            self.emit(ReconcileEvent::DuplicateQueryPath {
                path: duplicate.path.clone(),
                panels: duplicate.panels.clone(),
            });
        }
        Err(ReconcileError::DuplicateQueryPaths { duplicates })
    }

    fn plan_panel(&self, panel: &Value, candidate: &ExportCandidate, plan: &mut ExportPlan) {
        let panel_ref = PanelRef::of(panel);
        let targets = panel.array_at(&["targets"]);
        if targets.is_empty() {
            plan.panels_skipped += 1;
            self.emit(ReconcileEvent::PanelWithoutTargets { panel: panel_ref });
            return;
        }

        let datasource = DatasourceKind::of_panel(panel);
        let references = &candidate.references;
        for (index, target) in targets.iter().enumerate() {
            let ref_id = target.str_at(&["refId"]).to_string();
            let path = match references.get(index) {
                Some(reference) if references.len() > 1 => reference.clone(),
                _ => target_query_path(&candidate.base_path, &ref_id, targets.len()),
            };

            let (content, extension) = export_target(target, &datasource);
            if content.is_empty() {
                plan.targets_empty += 1;
                self.emit(ReconcileEvent::EmptyTargetContent {
                    panel: panel_ref.clone(),
                    target_index: index,
                    datasource: datasource.as_str().to_string(),
                    path,
                });
                continue;
            }
            if !is_contained(&path) {
                plan.targets_rejected += 1;
                self.emit(ReconcileEvent::UnsafeQueryPath {
                    panel: panel_ref.clone(),
                    target_index: index,
                    path,
                });
                continue;
            }

            let relative_path = if path.ends_with(extension) {
                path
            } else {
                format!("{path}{extension}")
            };
            plan.files.push(ExportFile {
                relative_path,
                content,
                panel: panel_ref.clone(),
                target_index: index,
                ref_id,
            });
        }
    }

    /// Writes the planned files under `<queries_dir>/queries/`.
    ///
    /// Existing files are kept unless `overwrite` is set. With `dry_run` nothing is
    /// written but the same events and counts are produced. The first failed write
    /// aborts the export.
    pub fn write_export(
        &self,
        plan: &ExportPlan,
        queries_dir: &Path,
        overwrite: bool,
        dry_run: bool,
    ) -> Result<ExportReport, ReconcileError> {
        let root = queries_dir.join(QUERIES_SUBDIR);
        if !dry_run {
            fs::create_dir_all(&root).map_err(|source| ReconcileError::CreateDir {
                path: root.clone(),
                source,
            })?;
        }

        let mut report = ExportReport::default();
        for file in &plan.files {
            let destination = root.join(&file.relative_path);
            if !overwrite && destination.exists() {
                report.files_skipped += 1;
                self.emit(ReconcileEvent::FileExists { path: destination });
                continue;
            }
            if !dry_run {
                write_atomically(&destination, &file.content)?;
            }
            report.files_written += 1;
            self.emit(ReconcileEvent::QueryExported {
                panel: file.panel.clone(),
                target_index: file.target_index,
                ref_id: file.ref_id.clone(),
                path: destination,
                dry_run,
            });
        }
        Ok(report)
    }

    /// Gives every query panel a description generated from its position in the
    /// hierarchy. Valid descriptions are kept unless `overwrite` is set.
    pub fn update_descriptions(
        &self,
        dashboard: &mut Value,
        hierarchy: &Hierarchy,
        overwrite: bool,
        dry_run: bool,
    ) -> DescriptionReport {
        let mut report = DescriptionReport::default();
        let Some(panels) = dashboard.array_at_mut(&["panels"]) else {
            return report;
        };

        for location in locate_panels(panels) {
            let Some(panel) = panel_at_mut(panels, location.position) else {
                continue;
            };
            if is_query_exempt(panel) {
                report.panels_skipped += 1;
                continue;
            }

            let panel_ref = PanelRef::of(panel);
            let current = panel.str_at(&["description"]);
            if !overwrite && is_valid_description(current) {
                report.panels_skipped += 1;
                self.emit(ReconcileEvent::DescriptionKept { panel: panel_ref });
                continue;
            }

            let description = generate_description(
                &hierarchy.folder_title,
                &hierarchy.dashboard_title,
                &location.row_title,
                &panel_ref.panel_type,
                &panel_ref.title,
            );
            if description == current {
                report.panels_skipped += 1;
                continue;
            }

            if !dry_run {
                panel.set_at(&["description"], Value::String(description.clone()));
            }
            report.panels_updated += 1;
            self.emit(ReconcileEvent::DescriptionUpdated {
                panel: panel_ref,
                row_title: location.row_title,
                description,
                dry_run,
            });
        }
        report
    }
}

/// True for non-empty relative paths that stay below the directory they are joined to.
fn is_contained(path: &str) -> bool {
    let path = Path::new(path);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Writes `content` through a temporary file in the destination directory, so a
/// failed write never leaves a truncated query file behind.
fn write_atomically(destination: &Path, content: &str) -> Result<(), ReconcileError> {
    let parent = destination.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|source| ReconcileError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })?;

    let write_error = |source: std::io::Error| ReconcileError::Write {
        path: destination.to_path_buf(),
        source,
    };
    let mut temp = NamedTempFile::new_in(parent).map_err(write_error)?;
    temp.write_all(content.as_bytes()).map_err(write_error)?;
    temp.persist(destination)
        .map_err(|err| write_error(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        catalog::{Query, QueryKind},
        events::RecordingObserver,
    };
    use serde_json::json;
    use tempfile::TempDir;

    fn catalog(entries: &[(&str, &str)]) -> QueryCatalog {
        let mut catalog = QueryCatalog::default();
        for (name, raw) in entries {
            catalog.insert(Query {
                name: name.to_string(),
                raw: raw.to_string(),
                kind: QueryKind::from_file_name(name).unwrap(),
            });
        }
        catalog
    }

    fn hierarchy() -> Hierarchy {
        Hierarchy {
            folder_title: "Business Metrics".into(),
            dashboard_title: "My Dashboard".into(),
        }
    }

    fn multi_target_dashboard() -> Value {
        json!({
            "title": "Nodes",
            "panels": [{
                "type": "graph",
                "title": "CPU",
                "description": "query=cpu_usage",
                "datasource": {"type": "prometheus"},
                "targets": [
                    {"refId": "F", "expr": "f_expr"},
                    {"refId": "B", "expr": "b_expr"},
                    {"refId": "A", "expr": "a_expr"}
                ]
            }]
        })
    }

    #[test]
    fn test_sync_multi_target_by_ref_id() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let mut dashboard = multi_target_dashboard();
        let catalog = catalog(&[
            ("cpu_usage_f.promql", "F!"),
            ("cpu_usage_b.promql", "B!"),
            ("cpu_usage_a.promql", "A!"),
        ]);

        let report = reconciler.sync_dashboard(&mut dashboard, &catalog);

        assert_eq!(report.targets_updated, 3);
        assert_eq!(report.panels_visited, 1);
        let targets = dashboard["panels"][0]["targets"].as_array().unwrap();
        let exprs: Vec<&str> = targets.iter().map(|t| t.str_at(&["expr"])).collect();
        assert_eq!(exprs, vec!["F!", "B!", "A!"]);
    }

    #[test]
    fn test_sync_legacy_single_reference() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let mut dashboard = json!({"panels": [{
            "type": "table",
            "title": "Old",
            "description": "query=old_panel",
            "datasource": {"type": "postgres"},
            "targets": [{"refId": "A", "rawSql": "stale"}]
        }]});

        let report =
            reconciler.sync_dashboard(&mut dashboard, &catalog(&[("old_panel.sql", "SELECT 1")]));

        assert_eq!(report.targets_updated, 1);
        assert_eq!(dashboard["panels"][0]["targets"][0]["rawSql"], "SELECT 1");
    }

    #[test]
    fn test_sync_multi_reference_description_is_positional() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let mut dashboard = json!({"panels": [{
            "type": "graph",
            "title": "Mixed",
            "description": "query=a/first\nquery=b/second",
            "datasource": {"type": "prometheus"},
            "targets": [{"refId": "A"}, {"refId": "B"}]
        }]});
        let catalog = catalog(&[("a/first.promql", "one"), ("b/second.promql", "two")]);

        reconciler.sync_dashboard(&mut dashboard, &catalog);

        assert_eq!(dashboard["panels"][0]["targets"][0]["expr"], "one");
        assert_eq!(dashboard["panels"][0]["targets"][1]["expr"], "two");
    }

    #[test]
    fn test_sync_skips_and_counts_missing_and_unsupported() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let mut dashboard = json!({"panels": [
            {"type": "graph", "title": "Influx", "description": "query=influx",
             "datasource": {"type": "influxdb"}, "targets": [{"refId": "A", "query": "keep"}]},
            {"type": "graph", "title": "Gone", "description": "query=gone",
             "datasource": {"type": "prometheus"}, "targets": [{"refId": "A", "expr": "keep"}]},
            {"type": "graph", "title": "Empty", "description": "query=empty", "targets": []},
            {"type": "graph", "title": "Bare"},
            {"type": "row", "title": "Row", "panels": []}
        ]});
        let before = dashboard.clone();

        let report = reconciler.sync_dashboard(&mut dashboard, &catalog(&[("influx.promql", "up")]));

        assert_eq!(
            report,
            SyncReport {
                panels_visited: 5,
                targets_updated: 0,
                targets_missing: 1,
                targets_unsupported: 1,
            }
        );
        assert_eq!(dashboard, before);

        let events = observer.events();
        assert!(matches!(events[0], ReconcileEvent::UnsupportedRewrite { .. }));
        assert!(matches!(
            &events[1],
            ReconcileEvent::QueryNotFound { ref_id, base_path, .. } if ref_id == "A" && base_path == "gone"
        ));
        assert!(matches!(events[2], ReconcileEvent::PanelWithoutTargets { .. }));
        assert!(matches!(events[3], ReconcileEvent::PanelWithoutDescription { .. }));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_sync_visits_nested_row_panels() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let mut dashboard = json!({"panels": [{
            "type": "row", "title": "Legacy", "panels": [{
                "type": "stat", "title": "Inner", "description": "query=inner",
                "datasource": {"type": "mysql"}, "targets": [{"refId": "A"}]
            }]
        }]});

        let report = reconciler.sync_dashboard(&mut dashboard, &catalog(&[("inner.sql", "SELECT 2")]));

        assert_eq!(report.panels_visited, 2);
        assert_eq!(dashboard["panels"][0]["panels"][0]["targets"][0]["rawSql"], "SELECT 2");
    }

    #[test]
    fn test_plan_export_multi_target_suffixes() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let plan = reconciler
            .plan_export(&multi_target_dashboard(), &hierarchy(), false)
            .unwrap();

        let files: Vec<(&str, &str)> = plan
            .files
            .iter()
            .map(|f| (f.relative_path.as_str(), f.content.as_str()))
            .collect();
        assert_eq!(
            files,
            vec![
                ("cpu_usage_f.promql", "f_expr"),
                ("cpu_usage_b.promql", "b_expr"),
                ("cpu_usage_a.promql", "a_expr"),
            ]
        );
    }

    #[test]
    fn test_plan_export_single_target_keeps_base_and_extension() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let dashboard = json!({"panels": [
            {"type": "table", "title": "T", "description": "query=reports/daily.sql",
             "datasource": {"type": "postgres"}, "targets": [{"refId": "A", "rawSql": "SELECT 1"}]},
            {"type": "stat", "title": "S", "description": "query=reports/empty",
             "datasource": {"type": "postgres"}, "targets": [{"refId": "A"}]}
        ]});

        let plan = reconciler.plan_export(&dashboard, &hierarchy(), false).unwrap();

        assert_eq!(plan.files.len(), 1);
        assert_eq!(plan.files[0].relative_path, "reports/daily.sql");
        assert_eq!(plan.targets_empty, 1);
    }

    #[test]
    fn test_plan_export_rejects_duplicate_base_paths() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let dashboard = json!({"panels": [
            {"type": "graph", "title": "One", "description": "query=shared",
             "datasource": {"type": "prometheus"}, "targets": [{"refId": "A", "expr": "1"}]},
            {"type": "row", "title": "R", "panels": [
                {"type": "stat", "title": "Two", "description": "query=shared\nquery=other",
                 "datasource": {"type": "prometheus"}, "targets": [{"refId": "A", "expr": "2"}]}
            ]}
        ]});

        let err = reconciler.plan_export(&dashboard, &hierarchy(), false).unwrap_err();

        let ReconcileError::DuplicateQueryPaths { duplicates } = err else {
            panic!("expected duplicate error, got {err:?}");
        };
        assert_eq!(
            duplicates,
            vec![DuplicatePath {
                path: "shared".into(),
                panels: vec![r#"graph:"One""#.into(), r#"stat:"Two""#.into()],
            }]
        );
    }

    #[test]
    fn test_plan_export_rejects_reference_claimed_by_two_panels() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let dashboard = json!({"panels": [
            {"type": "graph", "title": "One", "description": "query=x\nquery=y",
             "datasource": {"type": "prometheus"},
             "targets": [{"refId": "A", "expr": "one_a"}, {"refId": "B", "expr": "one_b"}]},
            {"type": "stat", "title": "Two", "description": "query=y",
             "datasource": {"type": "prometheus"}, "targets": [{"refId": "A", "expr": "two"}]}
        ]});

        let err = reconciler.plan_export(&dashboard, &hierarchy(), false).unwrap_err();

        let ReconcileError::DuplicateQueryPaths { duplicates } = err else {
            panic!("expected duplicate error, got {err:?}");
        };
        assert_eq!(
            duplicates,
            vec![DuplicatePath {
                path: "y.promql".into(),
                panels: vec![
                    r#"graph:"One" target[1]"#.into(),
                    r#"stat:"Two" target[0]"#.into()
                ],
            }]
        );
        assert!(observer.events().iter().any(
            |e| matches!(e, ReconcileEvent::DuplicateQueryPath { path, .. } if path == "y.promql")
        ));
    }

    #[test]
    fn test_plan_export_rejects_targets_sharing_a_ref_id() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let dashboard = json!({"panels": [
            {"type": "graph", "title": "CPU", "description": "query=cpu",
             "datasource": {"type": "prometheus"},
             "targets": [{"expr": "first"}, {"expr": "second"}]}
        ]});

        let err = reconciler.plan_export(&dashboard, &hierarchy(), false).unwrap_err();

        let ReconcileError::DuplicateQueryPaths { duplicates } = err else {
            panic!("expected duplicate error, got {err:?}");
        };
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].path, "cpu_.promql");
        assert_eq!(duplicates[0].panels.len(), 2);
    }

    #[test]
    fn test_plan_export_generates_missing_paths() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let dashboard = json!({"panels": [
            {"type": "row", "title": "System Metrics", "gridPos": {"y": 0}},
            {"type": "timeseries", "title": "Memory Usage", "gridPos": {"y": 1},
             "datasource": {"type": "prometheus"}, "targets": [{"refId": "A", "expr": "mem"}]},
            {"type": "text", "title": "Notes", "gridPos": {"y": 2}}
        ]});

        let skipped = reconciler.plan_export(&dashboard, &hierarchy(), false).unwrap();
        assert!(skipped.files.is_empty());
        assert_eq!(skipped.panels_skipped, 1);

        let plan = reconciler.plan_export(&dashboard, &hierarchy(), true).unwrap();
        assert_eq!(
            plan.files[0].relative_path,
            "business-metrics/my-dashboard/system-metrics/graph-memory-usage.promql"
        );
    }

    #[test]
    fn test_plan_export_rejects_escaping_paths() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let dashboard = json!({"panels": [
            {"type": "table", "title": "Evil", "description": "query=../../etc/passwd",
             "datasource": {"type": "mysql"}, "targets": [{"refId": "A", "rawSql": "x"}]},
            {"type": "table", "title": "Abs", "description": "query=/tmp/abs",
             "datasource": {"type": "mysql"}, "targets": [{"refId": "A", "rawSql": "x"}]}
        ]});

        let plan = reconciler.plan_export(&dashboard, &hierarchy(), false).unwrap();

        assert!(plan.files.is_empty());
        assert_eq!(plan.targets_rejected, 2);
    }

    #[test]
    fn test_write_export_respects_overwrite_and_dry_run() {
        let dir = TempDir::new().unwrap();
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let plan = reconciler
            .plan_export(&multi_target_dashboard(), &hierarchy(), false)
            .unwrap();

        let dry = reconciler.write_export(&plan, dir.path(), true, true).unwrap();
        assert_eq!(dry.files_written, 3);
        assert!(!dir.path().join("queries").exists());

        let existing = dir.path().join("queries/cpu_usage_b.promql");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, "hand edited").unwrap();

        let report = reconciler.write_export(&plan, dir.path(), false, false).unwrap();
        assert_eq!(report, ExportReport { files_written: 2, files_skipped: 1 });
        assert_eq!(fs::read_to_string(&existing).unwrap(), "hand edited");
        assert_eq!(
            fs::read_to_string(dir.path().join("queries/cpu_usage_f.promql")).unwrap(),
            "f_expr"
        );

        let report = reconciler.write_export(&plan, dir.path(), true, false).unwrap();
        assert_eq!(report.files_written, 3);
        assert_eq!(fs::read_to_string(&existing).unwrap(), "b_expr");
    }

    #[test]
    fn test_update_descriptions() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let mut dashboard = json!({"panels": [
            {"type": "table", "title": "CPU Usage", "gridPos": {"y": 0}},
            {"type": "row", "title": "System Metrics", "gridPos": {"y": 1}},
            {"type": "graph", "title": "Memory Usage", "gridPos": {"y": 2}, "description": "query="},
            {"type": "stat", "title": "Kept", "gridPos": {"y": 3}, "description": "query=custom/path"},
            {"type": "text", "title": "Notes", "gridPos": {"y": 4}}
        ]});

        let dry = reconciler.update_descriptions(&mut dashboard.clone(), &hierarchy(), false, true);
        let report = reconciler.update_descriptions(&mut dashboard, &hierarchy(), false, false);

        assert_eq!(dry, report);
        assert_eq!(report, DescriptionReport { panels_updated: 2, panels_skipped: 3 });
        assert_eq!(
            dashboard["panels"][0]["description"],
            "query=business-metrics/my-dashboard/table-cpu-usage"
        );
        assert_eq!(
            dashboard["panels"][2]["description"],
            "query=business-metrics/my-dashboard/system-metrics/graph-memory-usage"
        );
        assert_eq!(dashboard["panels"][3]["description"], "query=custom/path");
        assert!(dashboard["panels"][4].get("description").is_none());
    }

    #[test]
    fn test_update_descriptions_overwrite_and_dry_run() {
        let observer = RecordingObserver::default();
        let reconciler = Reconciler::new(&observer);
        let mut dashboard = json!({"panels": [
            {"type": "stat", "title": "Kept", "description": "query=custom/path"},
            {"type": "stat", "title": "Same", "description": "query=business-metrics/my-dashboard/stat-same"}
        ]});
        let before = dashboard.clone();

        let report = reconciler.update_descriptions(&mut dashboard, &hierarchy(), true, true);

        assert_eq!(report, DescriptionReport { panels_updated: 1, panels_skipped: 1 });
        assert_eq!(dashboard, before);
        assert!(observer
            .events()
            .iter()
            .any(|e| matches!(e, ReconcileEvent::DescriptionUpdated { dry_run: true, .. })));
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained("a/b/c"));
        assert!(is_contained("./a"));
        assert!(!is_contained(""));
        assert!(!is_contained("../a"));
        assert!(!is_contained("a/../../b"));
        assert!(!is_contained("/abs"));
    }
}
