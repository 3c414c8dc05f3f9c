// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Doubles that inject failures or record calls.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use twinsync_core::{
    AbortHandle, ETag, HookError, Href, Item, ItemRef, MemoryStatus, MemoryStorage,
    PostWriteHook, StatusError, StatusRecord, StatusStore, Storage, StorageError, WriteEvent,
};

/// A failure injected for writes of one ident, or reads and deletes of
/// one href.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The backend is unreachable.
    Unavailable,
    /// The item changed after it was listed.
    Stale,
    /// The item is already gone.
    Missing,
}

impl Fault {
    fn error(self, href: Option<&Href>) -> StorageError {
        let href = href.cloned().unwrap_or_else(|| Href::from("unknown"));
        match self {
            Fault::Unavailable => StorageError::Unavailable("injected".into()),
            Fault::Stale => StorageError::EtagMismatch {
                href,
                expected: ETag::from("stale"),
            },
            Fault::Missing => StorageError::NotFound(href),
        }
    }
}

/// Wraps a [`MemoryStorage`] and fails selected operations.
#[derive(Debug, Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    faults: Mutex<BTreeMap<String, Fault>>,
    href_faults: Mutex<BTreeMap<Href, Fault>>,
    fail_list: AtomicBool,
}

impl FlakyStorage {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: MemoryStorage) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Makes every write of `ident` fail with `fault`.
    pub fn inject(&self, ident: &str, fault: Fault) {
        self.faults
            .lock()
            .unwrap()
            .insert(ident.to_string(), fault);
    }

    /// Makes every get and delete of `href` fail with `fault`.
    pub fn inject_at(&self, href: &Href, fault: Fault) {
        self.href_faults
            .lock()
            .unwrap()
            .insert(href.clone(), fault);
    }

    /// Removes every injected fault.
    pub fn heal(&self) {
        self.faults.lock().unwrap().clear();
        self.href_faults.lock().unwrap().clear();
        self.fail_list.store(false, Ordering::SeqCst);
    }

    /// Makes listing fail.
    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    fn fault(&self, item: &Item, href: Option<&Href>) -> Result<(), StorageError> {
        match self.faults.lock().unwrap().get(item.ident()) {
            None => Ok(()),
            Some(fault) => Err(fault.error(href)),
        }
    }

    fn fault_at(&self, href: &Href) -> Result<(), StorageError> {
        match self.href_faults.lock().unwrap().get(href) {
            None => Ok(()),
            Some(fault) => Err(fault.error(Some(href))),
        }
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn list(&self) -> Result<Vec<ItemRef>, StorageError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected".into()));
        }
        self.inner.list().await
    }

    async fn get(&self, href: &Href) -> Result<(Item, ETag), StorageError> {
        self.fault_at(href)?;
        self.inner.get(href).await
    }

    async fn upload(&self, item: &Item) -> Result<(Href, ETag), StorageError> {
        self.fault(item, None)?;
        self.inner.upload(item).await
    }

    async fn update(&self, href: &Href, item: &Item, etag: &ETag) -> Result<ETag, StorageError> {
        self.fault(item, Some(href))?;
        self.inner.update(href, item, etag).await
    }

    async fn delete(&self, href: &Href, etag: &ETag) -> Result<(), StorageError> {
        self.fault_at(href)?;
        self.inner.delete(href, etag).await
    }
}

/// Wraps a [`MemoryStatus`] and fails writes once broken.
#[derive(Debug, Default)]
pub struct FlakyStatus {
    inner: MemoryStatus,
    broken: AtomicBool,
}

impl FlakyStatus {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: MemoryStatus) -> Self {
        Self {
            inner,
            broken: AtomicBool::new(false),
        }
    }

    /// Makes every following write fail.
    pub fn break_writes(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StatusError> {
        if self.broken.load(Ordering::SeqCst) {
            Err(StatusError::Corrupt("injected".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StatusStore for FlakyStatus {
    async fn get(&self, uid: &str) -> Result<Option<StatusRecord>, StatusError> {
        self.inner.get(uid).await
    }

    async fn put(&self, uid: &str, record: &StatusRecord) -> Result<(), StatusError> {
        self.check()?;
        self.inner.put(uid, record).await
    }

    async fn delete(&self, uid: &str) -> Result<(), StatusError> {
        self.check()?;
        self.inner.delete(uid).await
    }

    async fn all_uids(&self) -> Result<BTreeSet<String>, StatusError> {
        self.inner.all_uids().await
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, StatusRecord>, StatusError> {
        self.inner.snapshot().await
    }

    async fn replace_all(
        &self,
        records: &BTreeMap<String, StatusRecord>,
    ) -> Result<(), StatusError> {
        self.check()?;
        self.inner.replace_all(records).await
    }
}

/// Records every write event, optionally aborting the run after the first.
#[derive(Debug, Default)]
pub struct RecordingHook {
    events: Mutex<Vec<WriteEvent>>,
    abort: Option<AbortHandle>,
    fail: bool,
}

impl RecordingHook {
    /// Creates a hook that only records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hook that requests an abort on its first event.
    #[must_use]
    pub fn aborting(abort: AbortHandle) -> Self {
        Self {
            abort: Some(abort),
            ..Self::default()
        }
    }

    /// Creates a hook that records and then reports a failure.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// The recorded events, in call order.
    #[must_use]
    pub fn events(&self) -> Vec<WriteEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostWriteHook for RecordingHook {
    async fn after_write(&self, event: &WriteEvent) -> Result<(), HookError> {
        self.events.lock().unwrap().push(event.clone());
        if let Some(abort) = &self.abort {
            abort.abort();
        }
        if self.fail {
            return Err(HookError::Spawn {
                program: "recording".to_string(),
                source: std::io::Error::other("injected"),
            });
        }
        Ok(())
    }
}
