// src/system/grafana.rs

//! Blocking client for the Grafana HTTP API.

use crate::{
    core::workflows::DashboardStore,
    models::{DashboardSavePayload, DashboardWithMeta, Datasource, Folder, SearchResult, SearchType},
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest response body kept in a [`ApiError::Status`] message.
const MAX_ERROR_BODY: usize = 512;

/// Failures of a Grafana API call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never got a response.
    #[error("Request to '{endpoint}' failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-2xx status.
    #[error("'{endpoint}' answered with status {status}: {body}")]
    Status {
        status: u16,
        endpoint: String,
        body: String,
    },
    /// The response body did not match the expected shape.
    #[error("Failed to decode response of '{endpoint}': {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// No server URL was configured.
    #[error("No Grafana URL configured. Pass --url, set GRAFCTL_URL or define a profile.")]
    MissingUrl,
    /// The key cannot be used as a header value.
    #[error("The API key contains characters that cannot be sent in an HTTP header")]
    InvalidApiKey,
}

/// Result of a Grafana API call.
pub type ApiResult<T> = Result<T, ApiError>;

/// Filters of a dashboard search.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Title substring.
    pub query: Option<String>,
    /// Restricts hits to one kind.
    pub hit_type: Option<SearchType>,
}

#[derive(Serialize)]
struct NewFolder<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    uid: &'a str,
    title: &'a str,
}

#[derive(Serialize)]
struct FolderUpdate<'a> {
    title: &'a str,
    version: i64,
    overwrite: bool,
}

/// Talks to one Grafana server using a bearer API key.
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    base_url: String,
    client: Client,
}

impl GrafanaClient {
    /// Builds a client for `url`. A missing or empty URL is an error; the API key is
    /// optional for servers allowing anonymous access.
    pub fn new(url: Option<&str>, api_key: Option<&str>) -> ApiResult<Self> {
        let base_url = url
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or(ApiError::MissingUrl)?
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| ApiError::InvalidApiKey)?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ApiError::Http {
                endpoint: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, client })
    }

    /// Server URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The server host name, used to name backups.
    pub fn host(&self) -> String {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| self.base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send(&self, endpoint: &str, request: RequestBuilder) -> ApiResult<Response> {
        log::debug!("grafana request: {endpoint}");
        let response = request.send().map_err(|source| ApiError::Http {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body,
        })
    }

    fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> ApiResult<T> {
        response.json().map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let endpoint = format!("GET {path}");
        let response = self.send(&endpoint, self.client.get(self.url(path)))?;
        Self::decode(&endpoint, response)
    }

    fn write<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> ApiResult<Response> {
        let endpoint = format!("{method} {path}");
        let request = self.client.request(method, self.url(path)).json(body);
        self.send(&endpoint, request)
    }

    // --- Dashboards ---

    /// Fetches a dashboard with its metadata.
    pub fn get_dashboard_by_uid(&self, uid: &str) -> ApiResult<DashboardWithMeta> {
        self.get(&format!("/api/dashboards/uid/{uid}"))
    }

    /// Creates or overwrites a dashboard.
    pub fn save_dashboard(&self, payload: &DashboardSavePayload) -> ApiResult<()> {
        self.write(reqwest::Method::POST, "/api/dashboards/db", payload)?;
        Ok(())
    }

    /// Runs `GET /api/search`.
    pub fn search(&self, search: &SearchQuery) -> ApiResult<Vec<SearchResult>> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(hit_type) = search.hit_type {
            params.push(("type", hit_type.as_str()));
        }
        if let Some(query) = search.query.as_deref() {
            params.push(("query", query));
        }
        let endpoint = "GET /api/search".to_string();
        let request = self.client.get(self.url("/api/search")).query(&params);
        let response = self.send(&endpoint, request)?;
        Self::decode(&endpoint, response)
    }

    // --- Folders ---

    /// Lists every folder.
    pub fn list_folders(&self) -> ApiResult<Vec<Folder>> {
        self.get("/api/folders")
    }

    /// Fetches one folder.
    pub fn get_folder(&self, uid: &str) -> ApiResult<Folder> {
        self.get(&format!("/api/folders/{uid}"))
    }

    /// Creates a folder, keeping the given uid when non-empty.
    pub fn create_folder(&self, uid: &str, title: &str) -> ApiResult<Folder> {
        let path = "/api/folders";
        let response = self.write(reqwest::Method::POST, path, &NewFolder { uid, title })?;
        Self::decode(&format!("POST {path}"), response)
    }

    /// Renames a folder, overwriting concurrent changes.
    pub fn update_folder(&self, uid: &str, title: &str, version: i64) -> ApiResult<Folder> {
        let path = format!("/api/folders/{uid}");
        let body = FolderUpdate {
            title,
            version,
            overwrite: true,
        };
        let response = self.write(reqwest::Method::PUT, &path, &body)?;
        Self::decode(&format!("PUT {path}"), response)
    }

    // --- Datasources ---

    /// Lists every datasource.
    pub fn list_datasources(&self) -> ApiResult<Vec<Datasource>> {
        self.get("/api/datasources")
    }

    /// Fetches one datasource by numeric id.
    pub fn get_datasource(&self, id: i64) -> ApiResult<Datasource> {
        self.get(&format!("/api/datasources/{id}"))
    }

    /// Creates a datasource.
    pub fn create_datasource(&self, datasource: &Datasource) -> ApiResult<()> {
        self.write(reqwest::Method::POST, "/api/datasources", datasource)?;
        Ok(())
    }

    /// Overwrites the datasource with the same id.
    pub fn update_datasource(&self, datasource: &Datasource) -> ApiResult<()> {
        let path = format!("/api/datasources/{}", datasource.id);
        self.write(reqwest::Method::PUT, &path, datasource)?;
        Ok(())
    }
}

impl DashboardStore for GrafanaClient {
    fn fetch_dashboard(&self, uid: &str) -> anyhow::Result<DashboardWithMeta> {
        Ok(self.get_dashboard_by_uid(uid)?)
    }

    fn save_dashboard(&self, payload: &DashboardSavePayload) -> anyhow::Result<()> {
        Ok(GrafanaClient::save_dashboard(self, payload)?)
    }
}
