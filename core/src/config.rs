// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fingerprint::Normalization;
use crate::resolve::ConflictPolicy;

/// The name of the application.
pub const APP_NAME: &str = "twinsync";

const fn default_workers() -> usize {
    4
}

/// What to do with writes planned against a read-only storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialSync {
    /// Fail the entry.
    #[default]
    Error,
    /// Skip the entry and leave the status untouched.
    Ignore,
    /// Restore the writable side from the read-only one.
    Revert,
}

/// Synchronization settings of one pair.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// How conflicts are decided. There is no default.
    pub conflict_resolution: ConflictPolicy,

    /// Handling of writes against a read-only side.
    #[serde(default)]
    pub partial_sync: PartialSync,

    /// How item content is normalized before comparing.
    #[serde(default)]
    pub normalization: Normalization,

    /// Maximum number of entries executed concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl SyncConfig {
    /// Creates settings with the given conflict policy and defaults otherwise.
    #[must_use]
    pub fn new(conflict_resolution: ConflictPolicy) -> Self {
        Self {
            conflict_resolution,
            partial_sync: PartialSync::default(),
            normalization: Normalization::default(),
            workers: default_workers(),
        }
    }
}

/// Handle tilde (~) and environment variables in the path
///
/// # Errors
///
/// Returns an error if the path is not valid UTF-8 or the referenced
/// directory cannot be determined.
pub fn expand_path(path: &Path) -> Result<PathBuf, Box<dyn Error>> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }

    let path = path.to_str().ok_or("Invalid path")?;

    // Handle tilde and home directory
    let home_prefixes: &[&str] = if cfg!(unix) {
        &["~/", "$HOME/", "${HOME}/"]
    } else {
        &[r"~\", "~/", r"%UserProfile%\", r"%UserProfile%/"]
    };
    for prefix in home_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_home_dir()?.join(stripped));
        }
    }

    // Handle config directories
    let config_prefixes: &[&str] = if cfg!(unix) {
        &["$XDG_CONFIG_HOME/", "${XDG_CONFIG_HOME}/"]
    } else {
        &[r"%LOCALAPPDATA%\", "%LOCALAPPDATA%/"]
    };
    for prefix in config_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_config_dir()?.join(stripped));
        }
    }

    Ok(path.into())
}

/// Default directory of the status databases.
///
/// # Errors
///
/// Returns an error if no user-specific state directory is known.
pub fn default_status_dir() -> Result<PathBuf, Box<dyn Error>> {
    Ok(get_state_dir()?.join(APP_NAME))
}

fn get_home_dir() -> Result<PathBuf, Box<dyn Error>> {
    dirs::home_dir().ok_or("User-specific home directory not found".into())
}

fn get_config_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let config_dir = xdg::BaseDirectories::new().get_config_home();
    #[cfg(windows)]
    let config_dir = dirs::config_dir();
    config_dir.ok_or("User-specific config directory not found".into())
}

fn get_state_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let state_dir = xdg::BaseDirectories::new().get_state_home();
    #[cfg(windows)]
    let state_dir = dirs::data_dir();
    state_dir.ok_or("User-specific state directory not found".into())
}
