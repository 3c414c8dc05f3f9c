// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The durable memory of what each UID looked like after the last sync.

mod sqlite;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

pub use crate::status::sqlite::SqliteStatus;
use crate::fingerprint::Fingerprint;
use crate::types::{Identity, Side};

/// Last synchronized state of one UID on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    /// Identity on side A.
    pub a: Identity,
    /// Identity on side B.
    pub b: Identity,
    /// Fingerprint of the content both sides held.
    pub fingerprint: Fingerprint,
}

impl StatusRecord {
    /// Creates a record from the identities on both sides.
    #[must_use]
    pub const fn new(a: Identity, b: Identity, fingerprint: Fingerprint) -> Self {
        Self { a, b, fingerprint }
    }

    /// Creates a record from the identity on `side` and on the other side.
    #[must_use]
    pub fn from_sides(
        side: Side,
        this: Identity,
        other: Identity,
        fingerprint: Fingerprint,
    ) -> Self {
        match side {
            Side::A => Self::new(this, other, fingerprint),
            Side::B => Self::new(other, this, fingerprint),
        }
    }

    /// The identity recorded for `side`.
    #[must_use]
    pub const fn side(&self, side: Side) -> &Identity {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }
}

/// Errors of the status store. All of them are fatal for a sync run.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The store exists but cannot be trusted.
    #[error("status store is corrupt: {0}")]
    Corrupt(String),

    /// Database failure.
    #[error("status database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("status migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Filesystem failure around the store.
    #[error("status I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable per-UID status storage.
///
/// Implementations serialize their writes, so a store can be shared by
/// concurrently executing plan entries.
#[async_trait]
pub trait StatusStore: fmt::Debug + Send + Sync {
    /// Returns the record of `uid`, if any.
    async fn get(&self, uid: &str) -> Result<Option<StatusRecord>, StatusError>;

    /// Inserts or replaces the record of `uid`.
    async fn put(&self, uid: &str, record: &StatusRecord) -> Result<(), StatusError>;

    /// Removes the record of `uid`. Removing a missing record is not an error.
    async fn delete(&self, uid: &str) -> Result<(), StatusError>;

    /// Every UID with a record.
    async fn all_uids(&self) -> Result<BTreeSet<String>, StatusError>;

    /// Every record, keyed by UID.
    async fn snapshot(&self) -> Result<BTreeMap<String, StatusRecord>, StatusError>;

    /// Atomically replaces all records.
    async fn replace_all(&self, records: &BTreeMap<String, StatusRecord>)
    -> Result<(), StatusError>;
}

/// In-memory status store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatus {
    records: Arc<Mutex<BTreeMap<String, StatusRecord>>>,
}

impl MemoryStatus {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatus {
    async fn get(&self, uid: &str) -> Result<Option<StatusRecord>, StatusError> {
        Ok(self.records.lock().await.get(uid).cloned())
    }

    async fn put(&self, uid: &str, record: &StatusRecord) -> Result<(), StatusError> {
        self.records
            .lock()
            .await
            .insert(uid.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, uid: &str) -> Result<(), StatusError> {
        self.records.lock().await.remove(uid);
        Ok(())
    }

    async fn all_uids(&self) -> Result<BTreeSet<String>, StatusError> {
        Ok(self.records.lock().await.keys().cloned().collect())
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, StatusRecord>, StatusError> {
        Ok(self.records.lock().await.clone())
    }

    async fn replace_all(
        &self,
        records: &BTreeMap<String, StatusRecord>,
    ) -> Result<(), StatusError> {
        *self.records.lock().await = records.clone();
        Ok(())
    }
}
