// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use tokio::fs;
use twinsync_core::{APP_NAME, SyncConfig, default_status_dir, expand_path};
use twinsync_dav::DavConfig;

const TWINSYNC_CONFIG_ENV: &str = "TWINSYNC_CONFIG";

/// Locates and reads the configuration file.
///
/// The path given on the command line wins over `TWINSYNC_CONFIG`, which
/// wins over `$XDG_CONFIG_HOME/twinsync/config.toml`.
#[tracing::instrument]
pub async fn parse_config(path: Option<PathBuf>) -> Result<Config, Box<dyn Error>> {
    let path = if let Some(path) = path {
        path
    } else if let Ok(env_path) = std::env::var(TWINSYNC_CONFIG_ENV) {
        PathBuf::from(env_path)
    } else {
        let config = get_config_dir()?.join(format!("{APP_NAME}/config.toml"));
        if !config.exists() {
            return Err(format!("No config found at: {}", config.display()).into());
        }
        config
    };

    fs::read_to_string(&path)
        .await
        .map_err(|e| format!("Failed to read config file at {}: {}", path.display(), e))?
        .parse()
}

/// Configuration for the twinsync application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Settings shared by every pair.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Storages by name.
    #[serde(default)]
    pub storage: BTreeMap<String, StorageConfig>,

    /// Pairs by name.
    #[serde(default)]
    pub pair: BTreeMap<String, PairConfig>,
}

/// The `[general]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding one status database per pair.
    pub status_path: Option<PathBuf>,
}

/// One `[storage.NAME]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// A local directory of item files.
    Filesystem(FilesystemConfig),
    /// A `CalDAV` calendar collection.
    Caldav(DavConfig),
    /// A `CardDAV` address book.
    Carddav(DavConfig),
}

/// Settings of a filesystem storage.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesystemConfig {
    pub path: PathBuf,
    /// Extension of the item files, such as `.ics` or `.vcf`.
    pub fileext: String,
    #[serde(default)]
    pub read_only: bool,
}

/// One `[pair.NAME]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    /// Name of the storage on side A.
    pub a: String,

    /// Name of the storage on side B.
    pub b: String,

    /// Program run after every successful write.
    #[serde(default)]
    pub post_hook: Option<PathBuf>,

    #[serde(flatten)]
    pub sync: SyncConfig,
}

impl Config {
    /// Directory of the status databases, with `~` and variables expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be expanded or no default state
    /// directory is known.
    pub fn status_dir(&self) -> Result<PathBuf, Box<dyn Error>> {
        match &self.general.status_path {
            Some(path) => expand_path(path),
            None => default_status_dir(),
        }
    }

    /// Path of the status database of the named pair.
    ///
    /// # Errors
    ///
    /// See [`Config::status_dir`].
    pub fn status_db(&self, pair: &str) -> Result<PathBuf, Box<dyn Error>> {
        Ok(self.status_dir()?.join(format!("{pair}.db")))
    }

    /// Looks up a pair together with the configuration of both storages.
    ///
    /// # Errors
    ///
    /// Returns an error if the pair or one of its storages is not defined.
    pub fn pair(
        &self,
        name: &str,
    ) -> Result<(&PairConfig, &StorageConfig, &StorageConfig), Box<dyn Error>> {
        let pair = self
            .pair
            .get(name)
            .ok_or_else(|| format!("Unknown pair: {name}"))?;
        Ok((pair, self.storage(&pair.a)?, self.storage(&pair.b)?))
    }

    fn storage(&self, name: &str) -> Result<&StorageConfig, Box<dyn Error>> {
        self.storage
            .get(name)
            .ok_or_else(|| format!("Unknown storage: {name}").into())
    }

    /// Selects pairs by name, or every pair when `names` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a name does not match a configured pair.
    pub fn select_pairs(&self, names: &[String]) -> Result<Vec<String>, Box<dyn Error>> {
        if names.is_empty() {
            return Ok(self.pair.keys().cloned().collect());
        }
        for name in names {
            if !self.pair.contains_key(name) {
                return Err(format!("Unknown pair: {name}").into());
            }
        }
        Ok(names.to_vec())
    }

    fn validate(&self) -> Result<(), Box<dyn Error>> {
        for (name, pair) in &self.pair {
            if pair.a == pair.b {
                return Err(format!("Pair {name} uses storage {} on both sides", pair.a).into());
            }
            for storage in [&pair.a, &pair.b] {
                if !self.storage.contains_key(storage) {
                    return Err(format!("Pair {name} refers to unknown storage {storage}").into());
                }
            }
            if pair.sync.workers == 0 {
                return Err(format!("Pair {name}: workers must be at least 1").into());
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl FilesystemConfig {
    /// The directory, with `~` and variables expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be expanded.
    pub fn expanded_path(&self) -> Result<PathBuf, Box<dyn Error>> {
        expand_path(&self.path)
    }
}

fn get_config_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let config_dir = xdg::BaseDirectories::new().get_config_home();
    #[cfg(windows)]
    let config_dir = dirs::config_dir();
    config_dir.ok_or_else(|| "User-specific home directory not found".into())
}
