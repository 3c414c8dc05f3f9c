// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Two-way synchronization of calendar and contact items between two storages.
//!
//! The [`Synchronizer`] lists both sides, classifies every UID against the
//! [`StatusStore`], resolves conflicts by [`ConflictPolicy`], and applies the
//! resulting writes, recording each one in the status store as it succeeds.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro
)]

mod config;
mod diff;
mod fingerprint;
mod hook;
mod item;
mod report;
mod resolve;
mod status;
mod storage;
mod sync;
mod types;

pub use crate::config::{APP_NAME, PartialSync, SyncConfig, default_status_dir, expand_path};
pub use crate::diff::{Action, Duplicate, Plan, PlanEntry, break_ties, classify};
pub use crate::fingerprint::{Fingerprint, Normalization, fingerprint, normalize};
pub use crate::hook::{CommandHook, HookError, PostWriteHook, WriteEvent};
pub use crate::item::Item;
pub use crate::report::{
    Counts, EntryReport, Outcome, RunStatus, SkipReason, SyncFailure, SyncReport,
};
pub use crate::resolve::{ConflictPolicy, Resolution, resolve};
pub use crate::status::{MemoryStatus, SqliteStatus, StatusError, StatusRecord, StatusStore};
pub use crate::storage::{FilesystemStorage, ItemRef, MemoryStorage, Storage, StorageError};
pub use crate::sync::{AbortHandle, SyncError, SyncOptions, Synchronizer};
pub use crate::types::{ETag, Href, Identity, Side};
