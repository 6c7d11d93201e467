// src/system/backup_store.rs

//! Destinations for backup archives: a local directory or a Google Cloud Storage
//! bucket reached through its JSON API.

use crate::system::grafana::ApiError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Public endpoint of the Cloud Storage JSON API.
pub const GCS_BASE_URL: &str = "https://storage.googleapis.com";

const GCS_SCHEME: &str = "gs://";
const GCS_TIMEOUT: Duration = Duration::from_secs(60);

/// Failures while storing or loading backup archives.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Unknown `--provider` value.
    #[error("Backup provider '{0}' is not supported (expected 'local' or 'gcs')")]
    UnsupportedProvider(String),
    /// The restore source is neither a file nor a `gs://` URL.
    #[error("Invalid backup source '{0}' (expected gs://<bucket>/<object> or a file path)")]
    InvalidSource(String),
    /// `gcs` without `--out`.
    #[error("Missing bucket name for the gcs provider (use --out <bucket>)")]
    MissingBucket,
    /// `gcs` without an access token.
    #[error("Missing GCS access token (set GCS_ACCESS_TOKEN or gcs_token in the config file)")]
    MissingToken,
    /// A local file operation failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The archive is not valid gzip.
    #[error("Failed to (de)compress backup archive: {0}")]
    Compression(#[source] std::io::Error),
    /// A Grafana or Cloud Storage request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The archive does not hold a backup document.
    #[error("Failed to (de)serialize backup: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where a backup is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupProvider {
    Local,
    Gcs,
}

impl FromStr for BackupProvider {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "gcs" => Ok(Self::Gcs),
            other => Err(BackupError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for BackupProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Gcs => write!(f, "gcs"),
        }
    }
}

/// Persists finished archives.
pub trait BackupStore {
    /// Stores `bytes` as `name` and returns where it ended up.
    fn store(&self, name: &str, bytes: &[u8]) -> Result<String, BackupError>;
}

/// Writes archives into a directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// A store writing into `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BackupStore for LocalStore {
    fn store(&self, name: &str, bytes: &[u8]) -> Result<String, BackupError> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let destination = self.dir.join(name);
        let mut temp = NamedTempFile::new_in(&self.dir).map_err(io_error(&self.dir))?;
        temp.write_all(bytes).map_err(io_error(&destination))?;
        temp.persist(&destination)
            .map_err(|err| BackupError::Io {
                path: destination.clone(),
                source: err.error,
            })?;
        Ok(destination.display().to_string())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BackupError {
    let path = path.to_path_buf();
    move |source| BackupError::Io { path, source }
}

/// Reads and writes objects of one Cloud Storage bucket with a bearer token.
#[derive(Debug, Clone)]
pub struct GcsStore {
    client: Client,
    base_url: String,
    bucket: String,
    token: String,
}

impl GcsStore {
    /// A store for `bucket`; fails without a token.
    pub fn new(bucket: &str, token: Option<&str>) -> Result<Self, BackupError> {
        Self::with_base_url(GCS_BASE_URL, bucket, token)
    }

    /// Same as [`GcsStore::new`] against another API endpoint (emulators, tests).
    pub fn with_base_url(
        base_url: &str,
        bucket: &str,
        token: Option<&str>,
    ) -> Result<Self, BackupError> {
        if bucket.is_empty() {
            return Err(BackupError::MissingBucket);
        }
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(BackupError::MissingToken)?;
        let client = Client::builder()
            .timeout(GCS_TIMEOUT)
            .build()
            .map_err(|source| ApiError::Http {
                endpoint: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            token: token.to_string(),
        })
    }

    /// `<base><prefix>/<bucket>/<tail...>`, each segment percent-encoded so that
    /// object names may contain `/`.
    fn url(&self, prefix: &str, tail: &[&str]) -> Result<reqwest::Url, BackupError> {
        let raw = format!("{}{prefix}", self.base_url);
        let mut url =
            reqwest::Url::parse(&raw).map_err(|_| BackupError::InvalidSource(raw.clone()))?;
        url.path_segments_mut()
            .map_err(|()| BackupError::InvalidSource(raw.clone()))?
            .push(&self.bucket)
            .extend(tail);
        Ok(url)
    }

    fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, BackupError> {
        log::debug!("gcs request: {endpoint}");
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|source| ApiError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body: response.text().unwrap_or_default(),
        }
        .into())
    }

    /// Fails unless the bucket exists and the token can see it.
    pub fn check_bucket(&self) -> Result<(), BackupError> {
        let url = self.url("/storage/v1/b", &[])?;
        self.send(&format!("GET bucket {}", self.bucket), self.client.get(url))?;
        Ok(())
    }

    /// Downloads the content of `object`.
    pub fn fetch(&self, object: &str) -> Result<Vec<u8>, BackupError> {
        let url = self.url("/storage/v1/b", &["o", object])?;
        let endpoint = format!("GET {GCS_SCHEME}{}/{object}", self.bucket);
        let response = self.send(&endpoint, self.client.get(url).query(&[("alt", "media")]))?;
        let bytes = response.bytes().map_err(|source| ApiError::Decode {
            endpoint,
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

impl BackupStore for GcsStore {
    fn store(&self, name: &str, bytes: &[u8]) -> Result<String, BackupError> {
        let url = self.url("/upload/storage/v1/b", &["o"])?;
        let request = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", name)])
            .header(reqwest::header::CONTENT_TYPE, "application/gzip")
            .body(bytes.to_vec());
        let location = format!("{GCS_SCHEME}{}/{name}", self.bucket);
        self.send(&format!("POST {location}"), request)?;
        Ok(location)
    }
}

/// Where an import reads its archive from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupSource {
    Gcs { bucket: String, object: String },
    Local(PathBuf),
}

impl BackupSource {
    /// Parses `gs://<bucket>/<object>` or a local path.
    pub fn parse(src: &str) -> Result<Self, BackupError> {
        if src.is_empty() {
            return Err(BackupError::InvalidSource(src.to_string()));
        }
        let Some(rest) = src.strip_prefix(GCS_SCHEME) else {
            return Ok(Self::Local(PathBuf::from(src)));
        };
        match rest.split_once('/') {
            Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => Ok(Self::Gcs {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            _ => Err(BackupError::InvalidSource(src.to_string())),
        }
    }

    /// Reads the raw archive bytes.
    pub fn read(&self, gcs_token: Option<&str>) -> Result<Vec<u8>, BackupError> {
        self.read_from(GCS_BASE_URL, gcs_token)
    }

    /// Same as [`BackupSource::read`] with another Cloud Storage endpoint.
    pub fn read_from(&self, gcs_base_url: &str, gcs_token: Option<&str>) -> Result<Vec<u8>, BackupError> {
        match self {
            Self::Local(path) => fs::read(path).map_err(|source| BackupError::Io {
                path: path.clone(),
                source,
            }),
            Self::Gcs { bucket, object } => {
                GcsStore::with_base_url(gcs_base_url, bucket, gcs_token)?.fetch(object)
            }
        }
    }
}

impl fmt::Display for BackupSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gcs { bucket, object } => write!(f, "{GCS_SCHEME}{bucket}/{object}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use tempfile::TempDir;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("local".parse::<BackupProvider>().unwrap(), BackupProvider::Local);
        assert_eq!("gcs".parse::<BackupProvider>().unwrap(), BackupProvider::Gcs);
        let err = "s3".parse::<BackupProvider>().unwrap_err();
        assert!(matches!(err, BackupError::UnsupportedProvider(ref p) if p == "s3"));
    }

    #[test]
    fn test_parse_source() {
        assert_eq!(
            BackupSource::parse("gs://backups/monitoring-2020-12-20.json.gz").unwrap(),
            BackupSource::Gcs {
                bucket: "backups".into(),
                object: "monitoring-2020-12-20.json.gz".into(),
            }
        );
        assert_eq!(
            BackupSource::parse("./b.json.gz").unwrap(),
            BackupSource::Local(PathBuf::from("./b.json.gz"))
        );
        for invalid in ["", "gs://", "gs://bucket", "gs://bucket/", "gs:///object"] {
            assert!(
                matches!(BackupSource::parse(invalid), Err(BackupError::InvalidSource(_))),
                "{invalid:?}"
            );
        }
    }

    #[test]
    fn test_local_store_writes_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested");
        let location = LocalStore::new(&target).store("b.json.gz", b"data").unwrap();

        assert_eq!(location, target.join("b.json.gz").display().to_string());
        assert_eq!(fs::read(target.join("b.json.gz")).unwrap(), b"data");
        // Only the archive is left behind.
        assert_eq!(fs::read_dir(&target).unwrap().count(), 1);
    }

    #[test]
    fn test_gcs_store_requires_bucket_and_token() {
        assert!(matches!(
            GcsStore::new("", Some("t")),
            Err(BackupError::MissingBucket)
        ));
        assert!(matches!(
            GcsStore::new("bucket", None),
            Err(BackupError::MissingToken)
        ));
        assert!(matches!(
            GcsStore::new("bucket", Some("")),
            Err(BackupError::MissingToken)
        ));
    }

    #[test]
    fn test_gcs_store_uploads_and_checks_bucket() {
        let server = MockServer::start();
        let bucket = server.mock(|when, then| {
            when.method(GET)
                .path("/storage/v1/b/backups")
                .header("authorization", "Bearer tok");
            then.status(200).body(r#"{"name":"backups"}"#);
        });
        let upload = server.mock(|when, then| {
            when.method(POST)
                .path("/upload/storage/v1/b/backups/o")
                .query_param("uploadType", "media")
                .query_param("name", "host-2024-01-01-1.json.gz")
                .body("archive");
            then.status(200).body("{}");
        });

        let store = GcsStore::with_base_url(&server.base_url(), "backups", Some("tok")).unwrap();
        store.check_bucket().unwrap();
        let location = store.store("host-2024-01-01-1.json.gz", b"archive").unwrap();

        bucket.assert();
        upload.assert();
        assert_eq!(location, "gs://backups/host-2024-01-01-1.json.gz");
    }

    #[test]
    fn test_gcs_missing_bucket_is_an_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/storage/v1/b/nope");
            then.status(404).body("Not Found");
        });

        let store = GcsStore::with_base_url(&server.base_url(), "nope", Some("tok")).unwrap();
        let err = store.check_bucket().unwrap_err();
        assert!(matches!(err, BackupError::Api(ApiError::Status { status: 404, .. })));
    }

    #[test]
    fn test_read_gcs_source() {
        let server = MockServer::start();
        let download = server.mock(|when, then| {
            when.method(GET)
                .path("/storage/v1/b/backups/o/archive.json.gz")
                .query_param("alt", "media");
            then.status(200).body("gz-bytes");
        });

        let source = BackupSource::parse("gs://backups/archive.json.gz").unwrap();
        let bytes = source.read_from(&server.base_url(), Some("tok")).unwrap();

        download.assert();
        assert_eq!(bytes, b"gz-bytes");
    }

    #[test]
    fn test_read_local_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json.gz");
        fs::write(&path, b"xyz").unwrap();

        let source = BackupSource::Local(path.clone());
        assert_eq!(source.read(None).unwrap(), b"xyz");
        assert_eq!(source.to_string(), path.display().to_string());

        let missing = BackupSource::Local(dir.path().join("missing"));
        assert!(matches!(missing.read(None), Err(BackupError::Io { .. })));
    }
}
