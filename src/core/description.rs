// src/core/description.rs

//! Parsing of the `query=<path>` references embedded in panel descriptions.
//!
//! A description is free text. Every line of the form `<anything>query=<path>`
//! contributes one reference, in line order. Older dashboards carry a single
//! reference (or just a bare path); newer ones carry one reference per target.

use crate::constants::QUERY_MARKER;

/// Extracts the ordered query references from a panel description.
///
/// A line contributes only if it contains the marker exactly once and the trimmed
/// text after it is neither empty nor the marker itself.
pub fn parse_references(description: &str) -> Vec<String> {
    description
        .split('\n')
        .filter_map(|line| {
            let mut parts = line.split(QUERY_MARKER);
            let (_, path, None) = (parts.next(), parts.next()?, parts.next()) else {
                return None;
            };
            let path = path.trim();
            (!path.is_empty() && path != QUERY_MARKER).then(|| path.to_string())
        })
        .collect()
}

/// The base query path of a panel: its first reference, or the trimmed description
/// itself when it holds no reference at all (dashboards authored before the
/// `query=` syntax used the whole description as the path).
pub fn derive_base_path(description: &str) -> String {
    parse_references(description)
        .into_iter()
        .next()
        .unwrap_or_else(|| description.trim().to_string())
}

/// A description is valid when it is non-empty and holds at least one reference.
pub fn is_valid_description(description: &str) -> bool {
    !description.is_empty() && !parse_references(description).is_empty()
}
