// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Per-entry outcomes of a run and the summary derived from them.

use std::fmt;

use crate::diff::{Action, Duplicate};
use crate::status::StatusError;
use crate::storage::StorageError;
use crate::types::Side;

/// Why an entry was not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing to do.
    Unchanged,
    /// The etag moved but the content is the same; only the status was
    /// refreshed.
    ContentUnchanged,
    /// The conflict could not be resolved.
    UnresolvedConflict(String),
    /// The write targets a read-only side and partial sync ignores it.
    ReadOnly(Side),
    /// The run was aborted before the entry started.
    Aborted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unchanged => write!(f, "unchanged"),
            SkipReason::ContentUnchanged => write!(f, "content unchanged"),
            SkipReason::UnresolvedConflict(reason) => write!(f, "unresolved conflict: {reason}"),
            SkipReason::ReadOnly(side) => write!(f, "side {side} is read-only"),
            SkipReason::Aborted => write!(f, "aborted"),
        }
    }
}

/// Why an entry failed.
#[derive(Debug, thiserror::Error)]
pub enum SyncFailure {
    /// The item changed after it was listed; it is re-diffed next run.
    #[error("item on side {0} changed during sync")]
    Stale(Side),

    /// A storage operation failed.
    #[error("storage error on side {side}: {source}")]
    Storage {
        /// The side whose storage failed.
        side: Side,
        /// The storage error.
        source: StorageError,
    },

    /// The write targets a read-only side.
    #[error("side {0} is read-only")]
    ReadOnly(Side),

    /// The action needs an item the listing of that side did not contain.
    #[error("item is not listed on side {0}")]
    Missing(Side),

    /// Recording the result failed. This aborts the run.
    #[error("status error: {0}")]
    Status(#[from] StatusError),
}

impl SyncFailure {
    /// Classifies a storage error raised on `side`.
    #[must_use]
    pub fn storage(side: Side, source: StorageError) -> Self {
        match source {
            StorageError::EtagMismatch { .. } => SyncFailure::Stale(side),
            StorageError::ReadOnly => SyncFailure::ReadOnly(side),
            source => SyncFailure::Storage { side, source },
        }
    }
}

/// Result of executing one plan entry.
#[derive(Debug)]
pub enum Outcome {
    /// The action was written and recorded.
    Applied(Action),
    /// Nothing was written.
    Skipped(SkipReason),
    /// The entry failed; other entries are unaffected.
    Failed(SyncFailure),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied(action) => write!(f, "applied {action}"),
            Outcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            Outcome::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Outcome of one UID.
#[derive(Debug)]
pub struct EntryReport {
    /// The UID.
    pub uid: String,
    /// What happened to it.
    pub outcome: Outcome,
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every entry converged and no anomaly was found.
    Clean,
    /// The run finished, but some entries did not converge.
    CompletedWithErrors,
    /// The run stopped dispatching entries early.
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Clean => "clean",
            RunStatus::CompletedWithErrors => "completed_with_errors",
            RunStatus::Aborted => "aborted",
        })
    }
}

/// Numbers of entries per kind of outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Items created on either side.
    pub created: usize,
    /// Items overwritten on either side.
    pub updated: usize,
    /// Items deleted on either side.
    pub deleted: usize,
    /// Conflicts left unresolved.
    pub conflicted: usize,
    /// Entries that failed.
    pub failed: usize,
    /// Entries that needed no write.
    pub unchanged: usize,
    /// Entries skipped for read-only sides or an abort.
    pub skipped: usize,
}

/// The result of one sync run.
#[derive(Debug)]
pub struct SyncReport {
    /// Per-UID outcomes, ordered by UID.
    pub entries: Vec<EntryReport>,
    /// UIDs excluded because they are not unique on one side.
    pub duplicates: Vec<Duplicate>,
    /// Whether the run stopped early.
    pub aborted: bool,
}

impl SyncReport {
    /// Counts the outcomes.
    #[must_use]
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for entry in &self.entries {
            match &entry.outcome {
                Outcome::Applied(action) if action.is_create() => counts.created += 1,
                Outcome::Applied(action) if action.is_update() => counts.updated += 1,
                Outcome::Applied(action) if action.is_delete() => counts.deleted += 1,
                Outcome::Applied(_) => counts.unchanged += 1,
                Outcome::Skipped(SkipReason::Unchanged | SkipReason::ContentUnchanged) => {
                    counts.unchanged += 1;
                }
                Outcome::Skipped(SkipReason::UnresolvedConflict(_)) => counts.conflicted += 1,
                Outcome::Skipped(SkipReason::ReadOnly(_) | SkipReason::Aborted) => {
                    counts.skipped += 1;
                }
                Outcome::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    /// The overall status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        let counts = self.counts();
        if self.aborted {
            RunStatus::Aborted
        } else if counts.failed > 0 || counts.conflicted > 0 || !self.duplicates.is_empty() {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Clean
        }
    }

    /// The outcome of `uid`, if it was part of the run.
    #[must_use]
    pub fn outcome(&self, uid: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|e| e.uid == uid)
            .map(|e| &e.outcome)
    }
}
