//! core::config
//!
//! Repository configuration.
//!
//! One TOML file at `<common_dir>/braid/config.toml`, written by `bd init`:
//!
//! ```toml
//! trunk = "main"
//! remote = "origin"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::BranchName;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Repository-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// The trunk branch every stack ultimately descends from.
    pub trunk: BranchName,

    /// Remote used for fetch, push, and pull.
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl RepoConfig {
    pub fn new(trunk: BranchName) -> Self {
        Self {
            trunk,
            remote: default_remote(),
        }
    }

    /// Load the config, or `None` if the repository is not initialized.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = toml::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Some(config))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).expect("config serializes to TOML");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("braid").join("config.toml");

        let config = RepoConfig::new(BranchName::new("main").unwrap());
        config.save(&path).unwrap();

        let loaded = RepoConfig::load(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.remote, "origin");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let loaded = RepoConfig::load(&dir.path().join("config.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn remote_defaults_when_absent() {
        let config: RepoConfig = toml::from_str("trunk = \"develop\"").unwrap();
        assert_eq!(config.trunk.as_str(), "develop");
        assert_eq!(config.remote, "origin");
    }
}
