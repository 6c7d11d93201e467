// src/core/paths.rs

use crate::constants::{APP_CONFIG_DIR, CONFIG_FILENAME};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref GRAFCTL_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Failures while locating or expanding paths.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// `~` or an environment variable could not be expanded.
    #[error("Failed to expand path '{path}': {message}")]
    Expansion { path: String, message: String },
    /// The path does not resolve on disk.
    #[error("Failed to resolve path '{}': {source}", path.display())]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Returns the grafctl configuration directory (`~/.config/grafctl` on Linux).
///
/// The directory is not created: a missing config file simply means no profiles.
/// The first call computes the path; later calls return the cached value.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached = GRAFCTL_CONFIG_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(APP_CONFIG_DIR);
    *cached = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path of `config.toml` inside the config directory.
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Expands `~` and environment variables (`$VAR`, `${VAR}`) in a user supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(raw).map_err(|e| PathError::Expansion {
        path: raw.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Expands and canonicalizes a path that must already exist. Uses `dunce` so that
/// Windows paths stay free of the `\\?\` prefix.
pub fn resolve_existing(raw: &str) -> Result<PathBuf, PathError> {
    let expanded = expand_path(raw)?;
    canonicalize(&expanded)
}

fn canonicalize(path: &Path) -> Result<PathBuf, PathError> {
    dunce::canonicalize(path).map_err(|source| PathError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_path_keeps_plain_paths() {
        assert_eq!(expand_path("./queries").unwrap(), PathBuf::from("./queries"));
    }

    #[test]
    fn test_expand_path_home() {
        let home = dirs::home_dir().expect("home dir in test environment");
        assert_eq!(expand_path("~/queries").unwrap(), home.join("queries"));
    }

    #[test]
    fn test_expand_path_unknown_variable_fails() {
        let err = expand_path("$GRAFCTL_SURELY_UNSET_VARIABLE/x").unwrap_err();
        assert!(matches!(err, PathError::Expansion { .. }));
    }

    #[test]
    fn test_resolve_existing() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir(&nested).unwrap();

        let raw = format!("{}/a/../a", dir.path().display());
        let resolved = resolve_existing(&raw).unwrap();
        assert_eq!(resolved, dunce::canonicalize(&nested).unwrap());

        let missing = format!("{}/missing", dir.path().display());
        assert!(matches!(
            resolve_existing(&missing),
            Err(PathError::Canonicalize { .. })
        ));
    }

    #[test]
    fn test_config_file_path_is_under_app_dir() {
        let path = get_config_file_path().unwrap();
        assert!(path.ends_with("grafctl/config.toml"));
    }
}
