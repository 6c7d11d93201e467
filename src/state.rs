// src/state.rs

use crate::core::config_loader::Settings;
use crate::system::grafana::{ApiResult, GrafanaClient};
use std::sync::OnceLock;

/// Per-run state shared by every command handler.
///
/// The API client is built on first use, so commands that never talk to the server
/// (and `--help`) work without a configured URL.
#[derive(Debug)]
pub struct AppContext {
    settings: Settings,
    client: OnceLock<GrafanaClient>,
}

impl AppContext {
    /// Wraps resolved settings; no connection is made yet.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            client: OnceLock::new(),
        }
    }

    /// The resolved settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the API client, building it from the resolved settings on first use.
    pub fn client(&self) -> ApiResult<&GrafanaClient> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client =
            GrafanaClient::new(self.settings.url.as_deref(), self.settings.key.as_deref())?;
        log::debug!("connecting to {}", client.base_url());
        Ok(self.client.get_or_init(|| client))
    }

    /// Token for the `gcs` backup provider.
    pub fn gcs_token(&self) -> Option<&str> {
        self.settings.gcs_token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::grafana::ApiError;

    #[test]
    fn test_client_requires_url() {
        let context = AppContext::new(Settings::default());
        assert!(matches!(context.client(), Err(ApiError::MissingUrl)));
    }

    #[test]
    fn test_client_is_built_once() {
        let context = AppContext::new(Settings {
            url: Some("https://grafana.example.com".into()),
            ..Settings::default()
        });
        let first = context.client().unwrap() as *const GrafanaClient;
        let second = context.client().unwrap() as *const GrafanaClient;
        assert_eq!(first, second);
        assert_eq!(context.client().unwrap().host(), "grafana.example.com");
    }
}
