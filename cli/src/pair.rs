// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::sync::Arc;

use twinsync_core::{
    AbortHandle, CommandHook, FilesystemStorage, SqliteStatus, Storage, SyncOptions, Synchronizer,
};
use twinsync_dav::{DavKind, DavStorage};

use crate::config::{Config, StorageConfig};

/// A configured pair, ready to plan or run.
#[derive(Debug)]
pub struct Pair {
    pub name: String,
    pub synchronizer: Synchronizer,
    status: SqliteStatus,
}

impl Pair {
    /// Opens both storages and the status database of the named pair.
    #[tracing::instrument(skip(config, abort))]
    pub async fn open(
        config: &Config,
        name: &str,
        force_delete: bool,
        abort: AbortHandle,
    ) -> Result<Self, Box<dyn Error>> {
        let (pair, a, b) = config.pair(name)?;
        let a = open_storage(a).await?;
        let b = open_storage(b).await?;

        let path = config.status_db(name)?;
        tracing::debug!(path = %path.display(), "opening status database");
        let status = SqliteStatus::open(Some(&path)).await?;

        let options = SyncOptions {
            force_delete,
            ..SyncOptions::from(&pair.sync)
        };
        let mut synchronizer = Synchronizer::new(
            a,
            b,
            Arc::new(status.clone()),
            pair.sync.conflict_resolution,
        )
        .with_options(options)
        .with_abort_handle(abort);
        if let Some(program) = &pair.post_hook {
            synchronizer = synchronizer.with_hook(Arc::new(CommandHook::new(program, Vec::new())));
        }

        Ok(Self {
            name: name.to_string(),
            synchronizer,
            status,
        })
    }

    /// Flushes and closes the status database.
    pub async fn close(self) {
        self.status.close().await;
    }
}

async fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, Box<dyn Error>> {
    let storage: Arc<dyn Storage> = match config {
        StorageConfig::Filesystem(fs) => {
            let path = fs.expanded_path()?;
            let storage = FilesystemStorage::open(&path, &fs.fileext)
                .await?
                .with_read_only(fs.read_only);
            Arc::new(storage)
        }
        StorageConfig::Caldav(dav) => Arc::new(DavStorage::new(DavKind::CalDav, dav.clone())?),
        StorageConfig::Carddav(dav) => Arc::new(DavStorage::new(DavKind::CardDav, dav.clone())?),
    };
    tracing::debug!(storage = storage.name(), "opened storage");
    Ok(storage)
}
