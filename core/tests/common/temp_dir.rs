// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Temporary directory management for integration tests.
//!
//! This module provides utilities for creating and managing temporary
//! directories with automatic cleanup on drop.

use std::path::PathBuf;
use tokio::fs;

/// Temporary directories used for testing.
///
/// Automatically cleans up all created directories when dropped.
#[derive(Debug)]
pub struct TempDirs {
    /// Directory of side A.
    pub a_path: PathBuf,
    /// Directory of side B.
    pub b_path: PathBuf,
    /// Directory for the status database.
    pub state_dir: PathBuf,
}

impl TempDirs {
    /// Creates new temporary directories for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let base = tempfile::tempdir()?.keep();

        let a_path = base.join("a");
        let b_path = base.join("b");
        let state_dir = base.join("state");

        fs::create_dir_all(&a_path).await?;
        fs::create_dir_all(&b_path).await?;
        fs::create_dir_all(&state_dir).await?;

        Ok(Self {
            a_path,
            b_path,
            state_dir,
        })
    }

    /// Gets the base temporary directory.
    #[must_use]
    pub fn base(&self) -> PathBuf {
        self.a_path
            .parent()
            .expect("temp directories should have a parent")
            .to_path_buf()
    }

    /// Path of the status database.
    #[must_use]
    pub fn status_db(&self) -> PathBuf {
        self.state_dir.join("pair.db")
    }
}

/// Sets up temporary directories for integration tests.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub async fn setup_temp_dirs() -> Result<TempDirs, Box<dyn std::error::Error>> {
    TempDirs::new().await
}

impl Drop for TempDirs {
    fn drop(&mut self) {
        let base = self.base();
        if let Err(e) = std::fs::remove_dir_all(&base) {
            tracing::warn!(path = %base.display(), err = %e, "failed to clean up temp directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn temp_dirs_creates_directories() {
        let dirs = TempDirs::new().await.unwrap();

        assert!(dirs.a_path.is_dir());
        assert!(dirs.b_path.is_dir());
        assert!(dirs.state_dir.is_dir());
        assert!(dirs.status_db().starts_with(dirs.base()));
    }

    #[tokio::test]
    async fn temp_dirs_cleanup_on_drop() {
        let base = {
            let dirs = TempDirs::new().await.unwrap();
            let base = dirs.base();
            assert!(base.exists());
            base
        };

        assert!(!base.exists());
    }
}
