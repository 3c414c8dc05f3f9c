// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! An in-memory storage, mostly for tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::item::Item;
use crate::storage::{ItemRef, Storage, StorageError};
use crate::types::{ETag, Href};

#[derive(Debug, Clone)]
struct Entry {
    item: Item,
    etag: ETag,
    modified: Timestamp,
}

/// In-memory storage.
///
/// Every write issues a fresh random etag. Clones share the same items, so a
/// test can keep a handle while the synchronizer owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<BTreeMap<Href, Entry>>>,
    read_only: bool,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the storage read-only.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Inserts or replaces an item directly, bypassing etag checks.
    ///
    /// Returns the href and the newly issued etag.
    pub async fn put(&self, item: Item) -> (Href, ETag) {
        let mut items = self.items.lock().await;
        let href = items
            .iter()
            .find(|(_, e)| e.item.ident() == item.ident())
            .map_or_else(|| Self::new_href(&item), |(href, _)| href.clone());
        let etag = Self::new_etag();
        items.insert(
            href.clone(),
            Entry {
                item,
                etag: etag.clone(),
                modified: Timestamp::now(),
            },
        );
        (href, etag)
    }

    /// Removes the item with the given ident directly, bypassing etag checks.
    pub async fn remove(&self, ident: &str) -> Option<Item> {
        let mut items = self.items.lock().await;
        let href = items
            .iter()
            .find(|(_, e)| e.item.ident() == ident)
            .map(|(href, _)| href.clone())?;
        items.remove(&href).map(|e| e.item)
    }

    /// Returns the item with the given ident.
    pub async fn find(&self, ident: &str) -> Option<(Href, Item, ETag)> {
        let items = self.items.lock().await;
        items
            .iter()
            .find(|(_, e)| e.item.ident() == ident)
            .map(|(href, e)| (href.clone(), e.item.clone(), e.etag.clone()))
    }

    /// Overrides the modification time of an item.
    pub async fn set_modified(&self, href: &Href, modified: Timestamp) {
        if let Some(entry) = self.items.lock().await.get_mut(href) {
            entry.modified = modified;
        }
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Whether the storage holds no items.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    fn new_href(item: &Item) -> Href {
        Href::new(format!("{}-{}", Uuid::new_v4().simple(), item.ident().len()))
    }

    fn new_etag() -> ETag {
        ETag::new(Uuid::new_v4().to_string())
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.read_only {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    async fn list(&self) -> Result<Vec<ItemRef>, StorageError> {
        let items = self.items.lock().await;
        Ok(items
            .iter()
            .map(|(href, e)| ItemRef::new(e.item.ident(), href.clone(), e.etag.clone()))
            .collect())
    }

    async fn get(&self, href: &Href) -> Result<(Item, ETag), StorageError> {
        let items = self.items.lock().await;
        items
            .get(href)
            .map(|e| (e.item.clone(), e.etag.clone()))
            .ok_or_else(|| StorageError::NotFound(href.clone()))
    }

    async fn upload(&self, item: &Item) -> Result<(Href, ETag), StorageError> {
        self.check_writable()?;
        let mut items = self.items.lock().await;
        if let Some((href, _)) = items.iter().find(|(_, e)| e.item.ident() == item.ident()) {
            return Err(StorageError::AlreadyExists(href.clone()));
        }

        let href = Self::new_href(item);
        let etag = Self::new_etag();
        items.insert(
            href.clone(),
            Entry {
                item: item.clone(),
                etag: etag.clone(),
                modified: Timestamp::now(),
            },
        );
        Ok((href, etag))
    }

    async fn update(&self, href: &Href, item: &Item, etag: &ETag) -> Result<ETag, StorageError> {
        self.check_writable()?;
        let mut items = self.items.lock().await;
        let entry = items
            .get_mut(href)
            .ok_or_else(|| StorageError::NotFound(href.clone()))?;
        if &entry.etag != etag {
            return Err(StorageError::EtagMismatch {
                href: href.clone(),
                expected: etag.clone(),
            });
        }

        entry.item = item.clone();
        entry.etag = Self::new_etag();
        entry.modified = Timestamp::now();
        Ok(entry.etag.clone())
    }

    async fn delete(&self, href: &Href, etag: &ETag) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut items = self.items.lock().await;
        match items.get(href) {
            None => Err(StorageError::NotFound(href.clone())),
            Some(entry) if &entry.etag != etag => Err(StorageError::EtagMismatch {
                href: href.clone(),
                expected: etag.clone(),
            }),
            Some(_) => {
                items.remove(href);
                Ok(())
            }
        }
    }

    async fn last_modified(&self, href: &Href) -> Result<Option<Timestamp>, StorageError> {
        let items = self.items.lock().await;
        items
            .get(href)
            .map(|e| Some(e.modified))
            .ok_or_else(|| StorageError::NotFound(href.clone()))
    }
}
