// src/system/backup.rs

//! Full-server backups (datasources, folders, dashboards) and their restore.

use crate::{
    core::document::JsonPath,
    models::{DashboardSavePayload, Datasource, Folder, GrafanaBackup, SearchType},
    system::{
        archive,
        backup_store::{BackupError, BackupStore},
        grafana::{ApiError, GrafanaClient, SearchQuery},
    },
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Counts of what a restore touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Folders missing on the server.
    pub folders_created: usize,
    /// Folders renamed to match the backup.
    pub folders_updated: usize,
    /// Datasources missing on the server.
    pub datasources_created: usize,
    /// Datasources overwritten from the backup.
    pub datasources_updated: usize,
    /// Dashboards saved.
    pub dashboards_imported: usize,
}

/// Reads every datasource, folder and dashboard from the server.
pub fn collect_backup(client: &GrafanaClient) -> Result<GrafanaBackup, BackupError> {
    let datasources = client.list_datasources()?;
    let folders = client.list_folders()?;
    let hits = client.search(&SearchQuery {
        query: None,
        hit_type: Some(SearchType::Dashboard),
    })?;

    let mut dashboards = Vec::with_capacity(hits.len());
    for hit in &hits {
        log::info!("backing up dashboard ({}) {}", hit.uid, hit.title);
        dashboards.push(client.get_dashboard_by_uid(&hit.uid)?);
    }

    Ok(GrafanaBackup {
        datasources,
        folders,
        dashboards,
    })
}

/// `<host with '.' replaced by '_'>-<YYYY-MM-DD>-<unix nanos>.json.gz`, in UTC.
pub fn backup_name(host: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}.json.gz",
        host.replace('.', "_"),
        now.format("%Y-%m-%d"),
        now.timestamp_nanos_opt().unwrap_or_default()
    )
}

/// Serializes and gzips a backup.
pub fn encode_backup(backup: &GrafanaBackup) -> Result<Vec<u8>, BackupError> {
    let json = serde_json::to_vec(backup)?;
    archive::gzip(&json).map_err(BackupError::Compression)
}

/// Reverses [`encode_backup`].
pub fn decode_backup(bytes: &[u8]) -> Result<GrafanaBackup, BackupError> {
    let json = archive::gunzip(bytes).map_err(BackupError::Compression)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Collects a backup of the server and hands it to `store`. Returns the location
/// the archive was stored at.
pub fn backup(client: &GrafanaClient, store: &dyn BackupStore) -> Result<String, BackupError> {
    let backup = collect_backup(client)?;
    log::info!(
        "collected {} dashboard(s), {} datasource(s) and {} folder(s)",
        backup.dashboards.len(),
        backup.datasources.len(),
        backup.folders.len()
    );
    let bytes = encode_backup(&backup)?;
    let name = backup_name(&client.host(), Utc::now());
    store.store(&name, &bytes)
}

fn is_not_found(err: &ApiError) -> bool {
    matches!(err, ApiError::Status { status: 404, .. })
}

/// Writes a backup into the server: folders and datasources are upserted, then every
/// dashboard is saved as a new version into the folder of the same title.
pub fn restore(client: &GrafanaClient, backup: &GrafanaBackup) -> Result<RestoreReport, BackupError> {
    let mut report = RestoreReport::default();

    let mut folder_ids: HashMap<String, i64> = HashMap::new();
    for folder in &backup.folders {
        log::info!("importing folder {}", folder.title);
        let imported = upsert_folder(client, folder, &mut report)?;
        folder_ids.insert(imported.title.clone(), imported.id);
    }

    for datasource in &backup.datasources {
        log::info!("importing datasource {}", datasource.name);
        upsert_datasource(client, datasource, &mut report)?;
    }

    for full in &backup.dashboards {
        let folder_title = full.folder_title();
        let folder_id = folder_ids.get(folder_title).copied().unwrap_or_default();
        log::info!(
            "importing dashboard ({}) {} - folder '{folder_title}' {folder_id}",
            full.dashboard.str_at(&["uid"]),
            full.title()
        );

        let mut dashboard = full.dashboard.clone();
        dashboard.delete_at(&["id"]);
        client.save_dashboard(&DashboardSavePayload {
            dashboard,
            overwrite: true,
            folder_id,
            folder_uid: String::new(),
        })?;
        report.dashboards_imported += 1;
    }
    Ok(report)
}

fn upsert_folder(
    client: &GrafanaClient,
    folder: &Folder,
    report: &mut RestoreReport,
) -> Result<Folder, BackupError> {
    if !folder.uid.is_empty() {
        match client.get_folder(&folder.uid) {
            Ok(existing) => {
                report.folders_updated += 1;
                return Ok(client.update_folder(&folder.uid, &folder.title, existing.version)?);
            }
            Err(err) if is_not_found(&err) => {}
            Err(err) => return Err(err.into()),
        }
    }
    report.folders_created += 1;
    Ok(client.create_folder(&folder.uid, &folder.title)?)
}

fn upsert_datasource(
    client: &GrafanaClient,
    datasource: &Datasource,
    report: &mut RestoreReport,
) -> Result<(), BackupError> {
    if datasource.id != 0 {
        match client.get_datasource(datasource.id) {
            Ok(_) => {
                client.update_datasource(datasource)?;
                report.datasources_updated += 1;
                return Ok(());
            }
            Err(err) if is_not_found(&err) => {}
            Err(err) => return Err(err.into()),
        }
    }
    client.create_datasource(datasource)?;
    report.datasources_created += 1;
    Ok(())
}
