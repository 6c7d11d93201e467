// src/core/events.rs

//! Decisions taken by the reconciler, reported to an injected [`Observer`] so that a
//! run can be audited afterwards. Dry runs report exactly the same events.

use crate::core::document::JsonPath;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;

/// Identifies a panel in log lines as `type:"title"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRef {
    /// The panel `type`.
    pub panel_type: String,
    /// The panel `title`.
    pub title: String,
}

impl PanelRef {
    /// Reads type and title from a panel.
    pub fn of(panel: &Value) -> Self {
        Self {
            panel_type: panel.str_at(&["type"]).to_string(),
            title: panel.str_at(&["title"]).to_string(),
        }
    }
}

impl fmt::Display for PanelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.panel_type, self.title)
    }
}

/// One skip/update decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// A query panel has no description, so it points at no query file.
    PanelWithoutDescription {
        /// The skipped panel.
        panel: PanelRef,
    },
    /// A description holds no usable query path.
    PanelWithoutQueryPath {
        /// The skipped panel.
        panel: PanelRef,
        /// The description as found.
        description: String,
    },
    /// A panel has nothing to export.
    PanelWithoutTargets {
        /// The skipped panel.
        panel: PanelRef,
    },
    /// No catalog entry matches a target; it is left untouched.
    QueryNotFound {
        /// The panel owning the target.
        panel: PanelRef,
        /// Position of the target in the panel.
        target_index: usize,
        /// The target's `refId`.
        ref_id: String,
        /// The base path the lookup started from.
        base_path: String,
    },
    /// The query language cannot be written into this datasource.
    UnsupportedRewrite {
        /// The panel owning the target.
        panel: PanelRef,
        /// Position of the target in the panel.
        target_index: usize,
        /// Catalog name of the query.
        query: String,
        /// The panel's datasource type.
        datasource: String,
    },
    /// A target now runs the query from the catalog.
    TargetUpdated {
        /// The panel owning the target.
        panel: PanelRef,
        /// Position of the target in the panel.
        target_index: usize,
        /// The target's `refId`.
        ref_id: String,
        /// Catalog name of the query.
        query: String,
    },
    /// More than one panel or target claims the same query path.
    DuplicateQueryPath {
        /// The contested path.
        path: String,
        /// Every claimant, in traversal order.
        panels: Vec<String>,
    },
    /// A query path would leave the export directory.
    UnsafeQueryPath {
        /// The panel owning the target.
        panel: PanelRef,
        /// Position of the target in the panel.
        target_index: usize,
        /// The rejected path.
        path: String,
    },
    /// A target has no query text to export.
    EmptyTargetContent {
        /// The panel owning the target.
        panel: PanelRef,
        /// Position of the target in the panel.
        target_index: usize,
        /// The panel's datasource type.
        datasource: String,
        /// The path the target would have been written to.
        path: String,
    },
    /// A target was written (or would be, on a dry run) to a query file.
    QueryExported {
        /// The panel owning the target.
        panel: PanelRef,
        /// Position of the target in the panel.
        target_index: usize,
        /// The target's `refId`.
        ref_id: String,
        /// Destination file.
        path: PathBuf,
        /// Whether the write was skipped.
        dry_run: bool,
    },
    /// A query file already exists and overwriting is off.
    FileExists {
        /// The kept file.
        path: PathBuf,
    },
    /// A valid description is kept because overwriting is off.
    DescriptionKept {
        /// The untouched panel.
        panel: PanelRef,
    },
    /// A panel description was regenerated.
    DescriptionUpdated {
        /// The updated panel.
        panel: PanelRef,
        /// Title of the row holding the panel, empty outside rows.
        row_title: String,
        /// The new description.
        description: String,
        /// Whether the document was left unchanged.
        dry_run: bool,
    },
}

impl fmt::Display for ReconcileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PanelWithoutDescription { panel } => {
                write!(f, "no description found for panel {panel}")
            }
            Self::PanelWithoutQueryPath { panel, description } => write!(
                f,
                "no valid query path found for panel {panel} (description: {description:?})"
            ),
            Self::PanelWithoutTargets { panel } => write!(f, "no targets found for panel {panel}"),
            Self::QueryNotFound {
                panel,
                target_index,
                ref_id,
                base_path,
            } => write!(
                f,
                "[{panel}] target[{target_index}] query not found for base {base_path} with refId {ref_id:?}"
            ),
            Self::UnsupportedRewrite {
                panel,
                target_index,
                query,
                datasource,
            } => write!(
                f,
                "[{panel}] target[{target_index}] cannot apply {query} to datasource {datasource:?}"
            ),
            Self::TargetUpdated {
                panel,
                target_index,
                ref_id,
                query,
            } => write!(
                f,
                "target updated: [{panel}] target[{target_index}] {query} (refId: {ref_id})"
            ),
            Self::DuplicateQueryPath { path, panels } => write!(
                f,
                "found {} panels with same query path '{path}': {}",
                panels.len(),
                panels.join(", ")
            ),
            Self::UnsafeQueryPath {
                panel,
                target_index,
                path,
            } => write!(
                f,
                "[{panel}] target[{target_index}] query path {path:?} escapes the queries directory"
            ),
            Self::EmptyTargetContent {
                panel,
                target_index,
                datasource,
                path,
            } => write!(
                f,
                "[{panel}] target[{target_index}] has no query content for datasource {datasource:?} (path: {path})"
            ),
            Self::QueryExported {
                panel,
                target_index,
                ref_id,
                path,
                dry_run,
            } => {
                let action = if *dry_run { "would export" } else { "query exported" };
                write!(
                    f,
                    "{action}: [{panel}] target[{target_index}] {} (refId: {ref_id})",
                    path.display()
                )
            }
            Self::FileExists { path } => {
                write!(f, "skipping existing file: {}", path.display())
            }
            Self::DescriptionKept { panel } => {
                write!(f, "keeping panel description: [{panel}]")
            }
            Self::DescriptionUpdated {
                panel,
                row_title,
                description,
                dry_run,
            } => {
                let action = if *dry_run { "would update" } else { "updated" };
                if row_title.is_empty() {
                    write!(f, "{action} panel description: [{panel}] -> {description}")
                } else {
                    write!(
                        f,
                        "{action} panel description: [{panel}] in row [{row_title}] -> {description}"
                    )
                }
            }
        }
    }
}

/// Receives every decision the reconciler takes.
pub trait Observer {
    fn notify(&self, event: &ReconcileEvent);
}

/// Writes each event as an `info` log line. Shown with `--verbose`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn notify(&self, event: &ReconcileEvent) {
        log::info!("{event}");
    }
}

/// Keeps events in memory, for inspection after a run.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<ReconcileEvent>>,
}

impl RecordingObserver {
    /// Every event received so far, in order.
    pub fn events(&self) -> Vec<ReconcileEvent> {
        self.events.borrow().clone()
    }
}

impl Observer for RecordingObserver {
    fn notify(&self, event: &ReconcileEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
