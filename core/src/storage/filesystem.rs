// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! A directory holding one file per item.
//!
//! Writes go through a temporary file and a rename. The etag is built from
//! the modification time and the inode of the file.

use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::item::Item;
use crate::storage::{ItemRef, Storage, StorageError};
use crate::types::{ETag, Href};

/// Longest file stem derived from an item identifier.
const MAX_STEM_LEN: usize = 200;

/// A directory holding one item per file, all sharing one extension.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    path: PathBuf,
    fileext: String,
    read_only: bool,
    name: String,
}

impl FilesystemStorage {
    /// Opens the directory at `path`, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` exists but is not a directory, or if it
    /// cannot be created.
    #[tracing::instrument]
    pub async fn open(path: &Path, fileext: &str) -> Result<Self, StorageError> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(StorageError::Unavailable(format!(
                    "{} is not a directory",
                    path.display()
                )));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "creating storage directory");
                fs::create_dir_all(path).await?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path: path.to_path_buf(),
            fileext: fileext.to_string(),
            read_only: false,
            name: format!("filesystem:{}", path.display()),
        })
    }

    /// Marks the storage read-only.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// The directory backing this storage.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn href_for(&self, ident: &str) -> Href {
        let safe: String = ident
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || "_.-+@".contains(c) {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let stem = if safe.is_empty() || safe.len() > MAX_STEM_LEN || safe.starts_with('.') {
            Uuid::new_v4().simple().to_string()
        } else {
            safe
        };
        Href::new(format!("{stem}{}", self.fileext))
    }

    fn file_path(&self, href: &Href) -> Result<PathBuf, StorageError> {
        let valid = !href.is_empty()
            && !href.contains(['/', '\\'])
            && !href.starts_with('.')
            && href.ends_with(self.fileext.as_str());
        if valid {
            Ok(self.path.join(href.as_str()))
        } else {
            Err(StorageError::NotFound(href.clone()))
        }
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.read_only {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    async fn current_etag(&self, href: &Href, path: &Path) -> Result<ETag, StorageError> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(etag_from_metadata(&meta)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(href.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_temp(&self, content: &[u8]) -> io::Result<PathBuf> {
        let tmp = self
            .path
            .join(format!(".{}.tmp", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&tmp).await?;
        let written = async {
            file.write_all(content).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(tmp)
    }
}

#[async_trait]
impl Storage for FilesystemStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    #[tracing::instrument(skip(self), fields(storage = %self.name))]
    async fn list(&self) -> Result<Vec<ItemRef>, StorageError> {
        let mut reader = fs::read_dir(&self.path)
            .await
            .map_err(|e| StorageError::Unavailable(format!("failed to read directory: {e}")))?;

        let mut refs = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if file_name.starts_with('.') || !file_name.ends_with(self.fileext.as_str()) {
                continue;
            }

            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }

            let etag = etag_from_metadata(&meta)?;
            let bytes = fs::read(entry.path()).await?;
            // an unreadable item left out of the listing would look deleted
            let item = Item::from_bytes(bytes).map_err(|err| {
                tracing::error!(file_name, %err, "file is not valid UTF-8");
                StorageError::Unavailable(format!("{file_name} is not valid UTF-8: {err}"))
            })?;
            let href = Href::new(file_name.to_string());
            refs.push(ItemRef::new(item.ident(), href, etag));
        }

        tracing::debug!(count = refs.len(), "listed items");
        Ok(refs)
    }

    async fn get(&self, href: &Href) -> Result<(Item, ETag), StorageError> {
        let path = self.file_path(href)?;
        let etag = self.current_etag(href, &path).await?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(href.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let item = Item::from_bytes(bytes)
            .map_err(|e| StorageError::InvalidItem(format!("{href}: {e}")))?;
        Ok((item, etag))
    }

    async fn upload(&self, item: &Item) -> Result<(Href, ETag), StorageError> {
        self.check_writable()?;
        let href = self.href_for(item.ident());
        let path = self.file_path(&href)?;

        let tmp = self.write_temp(item.as_bytes()).await?;
        // a hard link never replaces an existing file
        let linked = fs::hard_link(&tmp, &path).await;
        let _ = fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(href));
            }
            Err(e) => return Err(e.into()),
        }

        let etag = self.current_etag(&href, &path).await?;
        tracing::debug!(%href, %etag, "uploaded item");
        Ok((href, etag))
    }

    async fn update(&self, href: &Href, item: &Item, etag: &ETag) -> Result<ETag, StorageError> {
        self.check_writable()?;
        let path = self.file_path(href)?;

        let current = self.current_etag(href, &path).await?;
        if &current != etag {
            return Err(StorageError::EtagMismatch {
                href: href.clone(),
                expected: etag.clone(),
            });
        }

        let tmp = self.write_temp(item.as_bytes()).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        let etag = self.current_etag(href, &path).await?;
        tracing::debug!(%href, %etag, "updated item");
        Ok(etag)
    }

    async fn delete(&self, href: &Href, etag: &ETag) -> Result<(), StorageError> {
        self.check_writable()?;
        let path = self.file_path(href)?;

        let current = self.current_etag(href, &path).await?;
        if &current != etag {
            return Err(StorageError::EtagMismatch {
                href: href.clone(),
                expected: etag.clone(),
            });
        }

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(href.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn locate(&self, href: &Href) -> String {
        let path = self.path.join(href.as_str());
        std::path::absolute(&path)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    async fn last_modified(&self, href: &Href) -> Result<Option<Timestamp>, StorageError> {
        let path = self.file_path(href)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(href.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Timestamp::try_from(meta.modified()?).ok())
    }
}

/// Derives an etag from modification time and inode (or length off unix).
fn etag_from_metadata(meta: &std::fs::Metadata) -> io::Result<ETag> {
    let mtime = meta
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map_err(io::Error::other)?
        .as_nanos();

    #[cfg(unix)]
    let extra = {
        use std::os::unix::fs::MetadataExt;
        meta.ino()
    };
    #[cfg(not(unix))]
    let extra = meta.len();

    Ok(ETag::new(format!("{mtime}.{extra}")))
}
