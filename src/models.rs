// src/models.rs

use crate::core::document::JsonPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- DASHBOARD DOCUMENTS ---
// Dashboards and their metadata stay as raw JSON so that a fetch/save round trip
// keeps fields we never look at.

/// `GET /api/dashboards/uid/{uid}` response.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DashboardWithMeta {
    /// Folder and version metadata.
    #[serde(default)]
    pub meta: Value,
    /// The dashboard model.
    #[serde(default)]
    pub dashboard: Value,
}

impl DashboardWithMeta {
    /// The dashboard title.
    pub fn title(&self) -> &str {
        self.dashboard.str_at(&["title"])
    }

    /// Title of the containing folder, empty for General.
    pub fn folder_title(&self) -> &str {
        self.meta.str_at(&["folderTitle"])
    }

    /// Builds the payload that writes this dashboard back to its own folder.
    pub fn save_payload(&self) -> DashboardSavePayload {
        DashboardSavePayload {
            dashboard: self.dashboard.clone(),
            overwrite: true,
            folder_id: self.meta.i64_at(&["folderId"]),
            folder_uid: self.meta.str_at(&["folderUid"]).to_string(),
        }
    }
}

/// `POST /api/dashboards/db` request body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSavePayload {
    /// The dashboard model to save.
    pub dashboard: Value,
    /// Replace a dashboard with the same uid or title.
    pub overwrite: bool,
    /// Legacy numeric folder id.
    pub folder_id: i64,
    /// Destination folder, General when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub folder_uid: String,
}

// --- SEARCH / FOLDERS / DATASOURCES ---

/// Kinds of search hits.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// A dashboard.
    #[serde(rename = "dash-db")]
    Dashboard,
    /// A folder.
    #[serde(rename = "dash-folder")]
    Folder,
    /// The home dashboard.
    #[serde(rename = "dash-home")]
    Home,
}

impl SearchType {
    /// The `type` query parameter value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dash-db",
            Self::Folder => "dash-folder",
            Self::Home => "dash-home",
        }
    }
}

/// One hit of `GET /api/search`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResult {
    /// Numeric id.
    pub id: i64,
    /// Stable uid.
    pub uid: String,
    /// Dashboard or folder title.
    pub title: String,
    /// Path of the UI page.
    pub url: String,
    /// `dash-db`, `dash-folder`, ...
    #[serde(rename = "type")]
    pub hit_type: String,
    /// Dashboard tags.
    pub tags: Vec<String>,
    /// Containing folder id.
    pub folder_id: i64,
    /// Containing folder uid, empty for General.
    pub folder_uid: String,
    /// Containing folder title.
    pub folder_title: String,
}

/// A dashboard folder.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Folder {
    /// Numeric id.
    pub id: i64,
    /// Stable uid.
    pub uid: String,
    /// Folder title.
    pub title: String,
    /// Path of the UI page.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Optimistic-locking version.
    pub version: i64,
}

/// A datasource definition. Only the identifying fields are typed; the rest of the
/// object (credentials, `jsonData`, ...) is carried through untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    /// Numeric id, server-assigned.
    #[serde(default)]
    pub id: i64,
    /// Stable uid.
    #[serde(default)]
    pub uid: String,
    /// Unique name.
    #[serde(default)]
    pub name: String,
    /// Plugin type, e.g. `prometheus`.
    #[serde(default, rename = "type")]
    pub datasource_type: String,
    /// Every other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// --- BACKUP ARCHIVE ---

/// Everything a backup captures from one server.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GrafanaBackup {
    /// Datasource definitions.
    #[serde(default)]
    pub datasources: Vec<Datasource>,
    /// Folders, restored before dashboards.
    #[serde(default)]
    pub folders: Vec<Folder>,
    /// Dashboards with their metadata.
    #[serde(default)]
    pub dashboards: Vec<DashboardWithMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_payload_carries_folder() {
        let full = DashboardWithMeta {
            meta: json!({"folderId": 7, "folderUid": "abc", "folderTitle": "Ops"}),
            dashboard: json!({"title": "Nodes", "panels": []}),
        };
        assert_eq!(full.title(), "Nodes");
        assert_eq!(full.folder_title(), "Ops");
        assert_eq!(
            serde_json::to_value(full.save_payload()).unwrap(),
            json!({
                "dashboard": {"title": "Nodes", "panels": []},
                "overwrite": true,
                "folderId": 7,
                "folderUid": "abc"
            })
        );
    }

    #[test]
    fn test_save_payload_for_general_folder() {
        let full = DashboardWithMeta {
            meta: json!({}),
            dashboard: json!({"title": "Home"}),
        };
        let payload = serde_json::to_value(full.save_payload()).unwrap();
        assert_eq!(payload["folderId"], 0);
        assert!(payload.get("folderUid").is_none());
    }

    #[test]
    fn test_datasource_keeps_unknown_fields() {
        let raw = json!({
            "id": 3,
            "uid": "p1",
            "name": "Prom",
            "type": "prometheus",
            "url": "http://prom:9090",
            "jsonData": {"httpMethod": "POST"}
        });
        let datasource: Datasource = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(datasource.id, 3);
        assert_eq!(datasource.datasource_type, "prometheus");
        assert_eq!(serde_json::to_value(&datasource).unwrap(), raw);
    }

    #[test]
    fn test_search_result_tolerates_missing_fields() {
        let hits: Vec<SearchResult> = serde_json::from_value(json!([
            {"uid": "a", "title": "A", "type": "dash-db", "folderTitle": "Ops"},
            {"uid": "b", "title": "B", "type": "dash-folder"}
        ]))
        .unwrap();
        assert_eq!(hits[0].hit_type, SearchType::Dashboard.as_str());
        assert_eq!(hits[0].folder_title, "Ops");
        assert_eq!(hits[1].folder_title, "");
        assert_eq!(SearchType::Folder.as_str(), "dash-folder");
    }
}
