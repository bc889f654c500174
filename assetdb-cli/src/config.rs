// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::time::Duration;

use assetdb_store::StoreOptions;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, IoContext};

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "assetdb.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the asset database file
    pub db_path: PathBuf,

    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,

    /// How long to wait on a locked database, in milliseconds
    pub busy_timeout_ms: u64,

    /// Use write-ahead logging
    pub wal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("assetdb.sqlite"),
            log_level: "info".to_string(),
            busy_timeout_ms: 5000,
            wal: true,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path)
            .io_context(|| format!("Failed to read config file at {}", path.display()))?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else [`DEFAULT_CONFIG_FILE`] in `dir` if it
    /// exists, else the defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let fallback = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            return Self::from_file(&fallback);
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), CliError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(CliError::config("db_path must not be empty"));
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            wal: self.wal,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.store_options(), StoreOptions::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "db_path = \"cache/assets.db\"\nwal = false\n",
        )
        .unwrap();

        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("cache/assets.db"));
        assert!(!config.wal);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "db_pth = \"typo.db\"\n").unwrap();
        assert!(matches!(
            Config::discover(Some(&path), dir.path()),
            Err(CliError::Toml(_))
        ));
    }

    #[test]
    fn test_empty_db_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "db_path = \"\"\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::discover(Some(&dir.path().join("nope.toml")), dir.path()).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }
}
