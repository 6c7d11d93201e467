//! # Config Loader
//!
//! Resolves the server connection settings from three layers, highest precedence
//! first: command-line flags, environment variables, and the profiles declared in
//! `<config_dir>/grafctl/config.toml`.
//!
//! ```toml
//! default_profile = "prod"
//! gcs_token = "..."
//!
//! [profiles.prod]
//! url = "https://grafana.example.com"
//! key = "..."
//! ```
use crate::{
    constants::{ENV_API_KEY, ENV_GCS_TOKEN, ENV_PROFILE, ENV_URL},
    core::paths,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but cannot be read.
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`ConfigFile`].
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// The selected profile is not in the file.
    #[error("Profile '{name}' is not defined (available: {})", display_names(.available))]
    UnknownProfile { name: String, available: Vec<String> },
    /// No config directory to look the profile up in.
    #[error("Could not find system config directory to look up profile '{0}'")]
    ConfigDirNotFound(String),
}

fn display_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// The on-disk configuration file.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    /// Profile used when none is selected.
    pub default_profile: Option<String>,
    /// Bearer token for the `gcs` backup provider.
    pub gcs_token: Option<String>,
    /// Named servers.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

/// Connection details of one server.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Base URL of the server.
    pub url: Option<String>,
    /// API key sent as a bearer token.
    pub key: Option<String>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--url`.
    pub url: Option<String>,
    /// `--key`.
    pub key: Option<String>,
    /// `--profile`.
    pub profile: Option<String>,
}

/// The effective settings of a run. `Debug` output hides the API key and GCS token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the server.
    pub url: Option<String>,
    /// API key, if any.
    pub key: Option<String>,
    /// The profile the settings were taken from, if any.
    pub profile: Option<String>,
    /// Token for GCS backups, from the environment or the file.
    pub gcs_token: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("profile", &self.profile)
            .field("gcs_token", &self.gcs_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Reads a config file. A missing file yields an empty configuration.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no config file at '{}'", path.display());
            return Ok(ConfigFile::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merges flags, environment and config file into the effective settings.
///
/// `env` looks up an environment variable; empty values count as unset.
pub fn resolve_settings<F>(
    overrides: &Overrides,
    file: &ConfigFile,
    env: F,
) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |name: &str| env(name).filter(|value| !value.is_empty());

    let profile_name = overrides
        .profile
        .clone()
        .or_else(|| env(ENV_PROFILE))
        .or_else(|| file.default_profile.clone());

    let profile = match &profile_name {
        Some(name) => Some(file.profiles.get(name).ok_or_else(|| {
            ConfigError::UnknownProfile {
                name: name.clone(),
                available: file.profiles.keys().cloned().collect(),
            }
        })?),
        None => None,
    };

    let settings = Settings {
        url: overrides
            .url
            .clone()
            .or_else(|| env(ENV_URL))
            .or_else(|| profile.and_then(|p| p.url.clone())),
        key: overrides
            .key
            .clone()
            .or_else(|| env(ENV_API_KEY))
            .or_else(|| profile.and_then(|p| p.key.clone())),
        profile: profile_name,
        gcs_token: env(ENV_GCS_TOKEN).or_else(|| file.gcs_token.clone()),
    };
    log::debug!(
        "resolved settings: url={:?}, profile={:?}, key set: {}",
        settings.url,
        settings.profile,
        settings.key.is_some()
    );
    Ok(settings)
}

/// Resolves the settings of this process, reading the user's config file and the
/// real environment.
pub fn load_settings(overrides: &Overrides) -> Result<Settings, ConfigError> {
    let file = match paths::get_config_file_path() {
        Ok(path) => load_config_file(&path)?,
        Err(e) => {
            if let Some(name) = &overrides.profile {
                return Err(ConfigError::ConfigDirNotFound(name.clone()));
            }
            log::debug!("{e}; continuing without a config file");
            ConfigFile::default()
        }
    };
    resolve_settings(overrides, &file, |name| std::env::var(name).ok())
}
