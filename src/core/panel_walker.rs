// src/core/panel_walker.rs

//! Traversal of a dashboard's panel list.
//!
//! Modern dashboards keep every panel at the top level and express grouping through
//! `row` panels placed above their members (by `gridPos.y`). Older ones, and collapsed
//! rows, nest the member panels inside the row's own `panels` array. The walker
//! flattens both shapes into one ordered list of positions, and works out which row
//! each panel belongs to.

use crate::core::document::JsonPath;
use serde_json::Value;

/// Panel type of row containers.
pub const ROW_PANEL_TYPE: &str = "row";

/// Panel type of free-text panels.
pub const TEXT_PANEL_TYPE: &str = "text";

/// Address of a panel inside the dashboard's `panels` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelPosition {
    /// `panels[index]`
    TopLevel(usize),
    /// `panels[parent].panels[index]`
    Nested { parent: usize, index: usize },
}

/// A flattened panel together with the title of the row it belongs to
/// (empty when ungrouped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLocation {
    /// Where the panel sits in the dashboard.
    pub position: PanelPosition,
    /// Title of the enclosing row.
    pub row_title: String,
}

/// A top-level row and its vertical position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMarker {
    /// Row title.
    pub title: String,
    /// `gridPos.y` of the row.
    pub y: i64,
}

/// True for `row` panels.
pub fn is_row(panel: &Value) -> bool {
    panel.str_at(&["type"]) == ROW_PANEL_TYPE
}

/// Rows and text panels carry no queries and may keep empty descriptions.
pub fn is_query_exempt(panel: &Value) -> bool {
    matches!(
        panel.str_at(&["type"]),
        ROW_PANEL_TYPE | TEXT_PANEL_TYPE
    )
}

/// Flattens the panel list. A panel holding nested panels is emitted after its
/// children, which keep their own order.
pub fn flatten_panels(panels: &[Value]) -> Vec<PanelPosition> {
    let mut positions = Vec::with_capacity(panels.len());
    for (parent, panel) in panels.iter().enumerate() {
        let nested = panel.array_at(&["panels"]);
        positions.extend((0..nested.len()).map(|index| PanelPosition::Nested { parent, index }));
        positions.push(PanelPosition::TopLevel(parent));
    }
    positions
}

/// Collects every top-level row in input order.
pub fn collect_rows(panels: &[Value]) -> Vec<RowMarker> {
    panels
        .iter()
        .filter(|panel| is_row(panel))
        .map(|row| RowMarker {
            title: row.str_at(&["title"]).to_string(),
            y: row.i64_at(&["gridPos", "y"]),
        })
        .collect()
}

/// The row sitting closest above `panel`: the largest `y` strictly below the panel's
/// own. On equal `y` the first row in input order wins.
pub fn row_for_panel<'a>(panel: &Value, rows: &'a [RowMarker]) -> Option<&'a str> {
    let panel_y = panel.i64_at(&["gridPos", "y"]);
    rows.iter()
        .filter(|row| row.y < panel_y)
        .fold(None::<&RowMarker>, |best, row| match best {
            Some(current) if current.y >= row.y => Some(current),
            _ => Some(row),
        })
        .map(|row| row.title.as_str())
}

/// Flattens the panel list and attaches each panel's row title. Nested panels belong
/// to their container; top-level panels to the nearest row above them; rows to none.
pub fn locate_panels(panels: &[Value]) -> Vec<PanelLocation> {
    let rows = collect_rows(panels);
    flatten_panels(panels)
        .into_iter()
        .map(|position| {
            let row_title = match position {
                PanelPosition::Nested { parent, .. } => panels
                    .get(parent)
                    .map(|row| row.str_at(&["title"]))
                    .unwrap_or_default(),
                PanelPosition::TopLevel(index) => match panels.get(index) {
                    Some(panel) if !is_row(panel) => {
                        row_for_panel(panel, &rows).unwrap_or_default()
                    }
                    _ => "",
                },
            };
            PanelLocation {
                position,
                row_title: row_title.to_string(),
            }
        })
        .collect()
}

/// Resolves a position to its panel.
pub fn panel_at(panels: &[Value], position: PanelPosition) -> Option<&Value> {
    match position {
        PanelPosition::TopLevel(index) => panels.get(index),
        PanelPosition::Nested { parent, index } => {
            panels.get(parent)?.array_at(&["panels"]).get(index)
        }
    }
}

/// Mutable variant of [`panel_at`].
pub fn panel_at_mut(panels: &mut [Value], position: PanelPosition) -> Option<&mut Value> {
    match position {
        PanelPosition::TopLevel(index) => panels.get_mut(index),
        PanelPosition::Nested { parent, index } => panels
            .get_mut(parent)?
            .array_at_mut(&["panels"])?
            .get_mut(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn titles(panels: &[Value], positions: &[PanelPosition]) -> Vec<String> {
        positions
            .iter()
            .map(|p| panel_at(panels, *p).unwrap().str_at(&["title"]).to_string())
            .collect()
    }

    #[test]
    fn test_flatten_emits_children_before_their_row() {
        let panels = vec![
            json!({"type": "graph", "title": "top"}),
            json!({"type": "row", "title": "legacy row", "panels": [
                {"type": "table", "title": "child 1"},
                {"type": "stat", "title": "child 2"}
            ]}),
            json!({"type": "row", "title": "empty row", "panels": []}),
        ];
        let positions = flatten_panels(&panels);
        assert_eq!(
            titles(&panels, &positions),
            vec!["top", "child 1", "child 2", "legacy row", "empty row"]
        );
        assert_eq!(positions[1], PanelPosition::Nested { parent: 1, index: 0 });
    }

    #[test]
    fn test_row_for_panel_picks_nearest_row_above() {
        let rows = vec![
            RowMarker { title: "System".into(), y: 0 },
            RowMarker { title: "Network".into(), y: 10 },
        ];
        assert_eq!(row_for_panel(&json!({"gridPos": {"y": 5}}), &rows), Some("System"));
        assert_eq!(row_for_panel(&json!({"gridPos": {"y": 11}}), &rows), Some("Network"));
        // A panel level with a row is not inside it.
        assert_eq!(row_for_panel(&json!({"gridPos": {"y": 10}}), &rows), Some("System"));
        assert_eq!(row_for_panel(&json!({"gridPos": {"y": 0}}), &rows), None);
        assert_eq!(row_for_panel(&json!({}), &rows), None);
    }

    #[test]
    fn test_row_for_panel_ties_go_to_first_row() {
        let rows = vec![
            RowMarker { title: "first".into(), y: 3 },
            RowMarker { title: "second".into(), y: 3 },
        ];
        assert_eq!(row_for_panel(&json!({"gridPos": {"y": 4}}), &rows), Some("first"));
    }

    #[test]
    fn test_locate_panels_assigns_rows() {
        let panels = vec![
            json!({"type": "stat", "title": "Overview", "gridPos": {"y": 0}}),
            json!({"type": "row", "title": "System", "gridPos": {"y": 1}}),
            json!({"type": "graph", "title": "CPU", "gridPos": {"y": 2}}),
            json!({"type": "row", "title": "Network", "gridPos": {"y": 10}, "panels": [
                {"type": "graph", "title": "Traffic", "gridPos": {"y": 11}}
            ]}),
            json!({"type": "table", "title": "Errors", "gridPos": {"y": 20}}),
        ];
        let located: Vec<(String, String)> = locate_panels(&panels)
            .into_iter()
            .map(|loc| {
                let title = panel_at(&panels, loc.position).unwrap().str_at(&["title"]);
                (title.to_string(), loc.row_title)
            })
            .collect();

        assert_eq!(
            located,
            vec![
                ("Overview".to_string(), String::new()),
                ("System".to_string(), String::new()),
                ("CPU".to_string(), "System".to_string()),
                ("Traffic".to_string(), "Network".to_string()),
                ("Network".to_string(), String::new()),
                ("Errors".to_string(), "Network".to_string()),
            ]
        );
    }

    #[test]
    fn test_panel_at_mut() {
        let mut panels = vec![json!({"type": "row", "panels": [{"title": "a"}]})];
        let position = PanelPosition::Nested { parent: 0, index: 0 };
        panel_at_mut(&mut panels, position)
            .unwrap()
            .set_at(&["title"], json!("b"));
        assert_eq!(panel_at(&panels, position).unwrap().str_at(&["title"]), "b");
        assert!(panel_at_mut(&mut panels, PanelPosition::TopLevel(3)).is_none());
    }

    #[test]
    fn test_query_exempt_types() {
        assert!(is_query_exempt(&json!({"type": "row"})));
        assert!(is_query_exempt(&json!({"type": "text"})));
        assert!(!is_query_exempt(&json!({"type": "graph"})));
    }
}
