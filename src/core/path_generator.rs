// src/core/path_generator.rs

//! Derives canonical query paths from a panel's place in the
//! folder → dashboard → row → panel hierarchy.

use crate::constants::QUERY_MARKER;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9]+").expect("valid regex");
}

const SLUG_SEPARATOR: &str = "-";
const UNTITLED: &str = "untitled";
const FALLBACK_PREFIX: &str = "panel";

/// Panel types that keep their own name as file prefix.
const KNOWN_PANEL_TYPES: &[&str] = &[
    "table",
    "graph",
    "stat",
    "heatmap",
    "barchart",
    "piechart",
    "gauge",
    "singlestat",
    "text",
    "row",
    "alertlist",
    "dashlist",
    "logs",
    "news",
    "pluginlist",
];

/// Turns a title into a lowercase slug of `[a-z0-9]` runs joined by `-`.
/// Titles with nothing usable become `untitled`.
pub fn sanitize(title: &str) -> String {
    let lowered = title.to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, SLUG_SEPARATOR);
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        UNTITLED.to_string()
    } else {
        slug.to_string()
    }
}

/// The file-name prefix for a panel type.
///
/// `timeseries` maps to `graph` so that panels migrated from the old graph panel keep
/// their existing query files.
pub fn panel_type_prefix(panel_type: &str) -> &str {
    match panel_type {
        "timeseries" => "graph",
        known if KNOWN_PANEL_TYPES.contains(&known) => known,
        _ => FALLBACK_PREFIX,
    }
}

/// The relative query path of a panel, without the `query=` marker.
pub fn generate_path(
    folder_title: &str,
    dashboard_title: &str,
    row_title: &str,
    panel_type: &str,
    panel_title: &str,
) -> String {
    let mut segments = vec![sanitize(folder_title), sanitize(dashboard_title)];
    if !row_title.is_empty() {
        segments.push(sanitize(row_title));
    }
    segments.push(format!(
        "{}-{}",
        panel_type_prefix(panel_type),
        sanitize(panel_title)
    ));
    segments.join("/")
}

/// The description line pointing a panel at its generated query path.
pub fn generate_description(
    folder_title: &str,
    dashboard_title: &str,
    row_title: &str,
    panel_type: &str,
    panel_title: &str,
) -> String {
    format!(
        "{QUERY_MARKER}{}",
        generate_path(
            folder_title,
            dashboard_title,
            row_title,
            panel_type,
            panel_title
        )
    )
}

/// The query path of one target. Panels with more than one target get a
/// `_<refid>` suffix per target; a lone target keeps the bare base path.
pub fn target_query_path(base: &str, ref_id: &str, target_count: usize) -> String {
    if target_count > 1 {
        format!("{base}_{}", ref_id.to_lowercase())
    } else {
        base.to_string()
    }
}
