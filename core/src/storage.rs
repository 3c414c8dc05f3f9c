// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The capability set every storage backend exposes to the synchronizer.

mod filesystem;
mod memory;

use std::fmt;

use async_trait::async_trait;
use jiff::Timestamp;

pub use crate::storage::filesystem::FilesystemStorage;
pub use crate::storage::memory::MemoryStorage;
use crate::item::Item;
use crate::types::{ETag, Href};

/// One entry of a storage listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    /// Identifier used to pair the item across storages.
    pub uid: String,
    /// The storage-local href.
    pub href: Href,
    /// The current etag.
    pub etag: ETag,
}

impl ItemRef {
    /// Creates a new listing entry.
    pub fn new(uid: impl Into<String>, href: Href, etag: ETag) -> Self {
        Self {
            uid: uid.into(),
            href,
            etag,
        }
    }
}

/// Errors reported by storage backends.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend cannot be reached or read.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// No item exists at the given href.
    #[error("item not found: {0}")]
    NotFound(Href),

    /// The stored etag differs from the expected one.
    #[error("etag mismatch for {href}: expected {expected}")]
    EtagMismatch {
        /// The href that was written to.
        href: Href,
        /// The etag the caller expected.
        expected: ETag,
    },

    /// An item with a colliding identity already exists.
    #[error("item already exists: {0}")]
    AlreadyExists(Href),

    /// The backend refuses the item content.
    #[error("invalid item: {0}")]
    InvalidItem(String),

    /// The storage is configured read-only.
    #[error("storage is read-only")]
    ReadOnly,

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A collection of items addressed by href and guarded by etags.
///
/// Implementations own their I/O timeouts and retries; the synchronizer
/// calls each method at most once per item and never concurrently for the
/// same href.
#[async_trait]
pub trait Storage: fmt::Debug + Send + Sync {
    /// Short human readable description, used in logs.
    fn name(&self) -> &str;

    /// Whether writes to this storage are forbidden.
    fn read_only(&self) -> bool {
        false
    }

    /// Lists every item of the collection.
    async fn list(&self) -> Result<Vec<ItemRef>, StorageError>;

    /// Fetches one item and its current etag.
    async fn get(&self, href: &Href) -> Result<(Item, ETag), StorageError>;

    /// Stores a new item, returning where it was stored.
    async fn upload(&self, item: &Item) -> Result<(Href, ETag), StorageError>;

    /// Replaces an existing item if its etag still matches.
    async fn update(&self, href: &Href, item: &Item, etag: &ETag) -> Result<ETag, StorageError>;

    /// Removes an item if its etag still matches.
    async fn delete(&self, href: &Href, etag: &ETag) -> Result<(), StorageError>;

    /// Where an item can be found outside twinsync, such as a file path or
    /// an URL. Handed to post-write hooks.
    fn locate(&self, href: &Href) -> String {
        href.to_string()
    }

    /// When the item was last modified, if the backend knows.
    async fn last_modified(&self, _href: &Href) -> Result<Option<Timestamp>, StorageError> {
        Ok(None)
    }
}
