// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test data factories for integration tests.

use std::sync::Arc;

use twinsync_core::{
    ConflictPolicy, Item, MemoryStatus, MemoryStorage, SyncOptions, Synchronizer,
};

/// Creates a calendar item with the given UID and summary.
#[must_use]
pub fn vevent(uid: &str, summary: &str) -> Item {
    Item::new(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//twinsync//test//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:20260101T000000Z\r\n\
         DTSTART:20260102T100000Z\r\n\
         SUMMARY:{summary}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    ))
}

/// Creates a contact card with the given UID and name.
#[must_use]
pub fn vcard(uid: &str, name: &str) -> Item {
    Item::new(format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:{uid}\r\nFN:{name}\r\nEND:VCARD\r\n"
    ))
}

/// Two in-memory storages and an in-memory status store.
///
/// The handles share state with the synchronizers built from them, so a
/// test can mutate either side between runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryPair {
    /// Side A.
    pub a: MemoryStorage,
    /// Side B.
    pub b: MemoryStorage,
    /// The status store.
    pub status: MemoryStatus,
}

impl MemoryPair {
    /// Creates an empty pair.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a synchronizer over the pair.
    #[must_use]
    pub fn synchronizer(&self, policy: ConflictPolicy) -> Synchronizer {
        self.synchronizer_with(policy, SyncOptions::default())
    }

    /// Builds a synchronizer over the pair with the given options.
    #[must_use]
    pub fn synchronizer_with(&self, policy: ConflictPolicy, options: SyncOptions) -> Synchronizer {
        Synchronizer::new(
            Arc::new(self.a.clone()),
            Arc::new(self.b.clone()),
            Arc::new(self.status.clone()),
            policy,
        )
        .with_options(options)
    }
}
