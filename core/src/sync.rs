// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Two-way synchronization of one pair of storages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{StreamExt, future, stream};

use crate::config::{PartialSync, SyncConfig};
use crate::diff::{Action, Plan, PlanEntry, break_ties, classify};
use crate::fingerprint::{Normalization, fingerprint};
use crate::hook::{PostWriteHook, WriteEvent};
use crate::report::{EntryReport, Outcome, SkipReason, SyncFailure, SyncReport};
use crate::resolve::{ConflictPolicy, Resolution, resolve};
use crate::status::{StatusError, StatusRecord, StatusStore};
use crate::storage::{Storage, StorageError};
use crate::types::{ETag, Href, Identity, Side};

/// Errors that stop a run before any entry is executed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A storage could not be listed.
    #[error("failed to list side {side}: {source}")]
    Listing {
        /// The side that failed.
        side: Side,
        /// The storage error.
        source: StorageError,
    },

    /// The status store failed.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// One side is empty while the status remembers items; syncing would
    /// delete everything on the other side.
    #[error("side {side} is empty but the status has records, use force delete to proceed")]
    StorageEmpty {
        /// The empty side.
        side: Side,
    },
}

/// Tuning of a run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum number of entries executed concurrently.
    pub workers: usize,
    /// How item content is normalized before comparing.
    pub normalization: Normalization,
    /// Handling of writes against a read-only side.
    pub partial_sync: PartialSync,
    /// Proceed even if one side is empty while the status has records.
    pub force_delete: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            normalization: Normalization::default(),
            partial_sync: PartialSync::default(),
            force_delete: false,
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            workers: config.workers,
            normalization: config.normalization,
            partial_sync: config.partial_sync,
            force_delete: false,
        }
    }
}

/// Stops a running sync from dispatching further entries.
///
/// Entries already in flight finish normally.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Creates a handle that is not aborted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the abort.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an abort was requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Synchronizes two storages through a status store.
#[derive(Debug)]
pub struct Synchronizer {
    a: Arc<dyn Storage>,
    b: Arc<dyn Storage>,
    status: Arc<dyn StatusStore>,
    policy: ConflictPolicy,
    hook: Option<Arc<dyn PostWriteHook>>,
    options: SyncOptions,
    abort: AbortHandle,
}

impl Synchronizer {
    /// Creates a synchronizer with default options.
    pub fn new(
        a: Arc<dyn Storage>,
        b: Arc<dyn Storage>,
        status: Arc<dyn StatusStore>,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            a,
            b,
            status,
            policy,
            hook: None,
            options: SyncOptions::default(),
            abort: AbortHandle::new(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs a hook called after every applied write.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn PostWriteHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Uses the given abort handle instead of a private one.
    #[must_use]
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// A handle to abort this synchronizer.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Computes the plan without writing anything.
    ///
    /// Conflicts carry their resolution.
    #[tracing::instrument(skip(self), fields(a = self.a.name(), b = self.b.name()))]
    pub async fn plan(&self) -> Result<Plan, SyncError> {
        let (listing_a, listing_b) = future::join(self.a.list(), self.b.list()).await;
        let listing_a = listing_a.map_err(|source| SyncError::Listing {
            side: Side::A,
            source,
        })?;
        let listing_b = listing_b.map_err(|source| SyncError::Listing {
            side: Side::B,
            source,
        })?;
        tracing::debug!(a = listing_a.len(), b = listing_b.len(), "listed storages");

        let snapshot = self.status.snapshot().await?;
        if !self.options.force_delete && !snapshot.is_empty() {
            for (side, listing) in [(Side::A, &listing_a), (Side::B, &listing_b)] {
                if listing.is_empty() {
                    return Err(SyncError::StorageEmpty { side });
                }
            }
        }

        let mut plan = classify(&listing_a, &listing_b, &snapshot);
        break_ties(
            &mut plan,
            self.a.as_ref(),
            self.b.as_ref(),
            self.options.normalization,
        )
        .await;

        for entry in &mut plan.entries {
            if entry.action == Action::Conflict {
                let resolution =
                    resolve(entry, self.policy, self.a.as_ref(), self.b.as_ref()).await;
                tracing::debug!(uid = %entry.uid, ?resolution, "conflict");
                entry.resolution = Some(resolution);
            }
        }

        tracing::info!(
            actions = plan.actions(),
            stale = plan.stale.len(),
            duplicates = plan.duplicates.len(),
            "planned"
        );
        Ok(plan)
    }

    /// Runs one sync.
    ///
    /// Entry failures are reported in the result; only failures that leave
    /// no consistent snapshot to work from are returned as errors.
    #[tracing::instrument(skip(self), fields(a = self.a.name(), b = self.b.name()))]
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let plan = self.plan().await?;

        for uid in &plan.stale {
            tracing::debug!(%uid, "pruning status of item gone from both sides");
            self.status.delete(uid).await?;
        }

        let halted = AtomicBool::new(false);
        let halted = &halted;
        let mut entries: Vec<EntryReport> = stream::iter(plan.entries)
            .map(|entry| self.dispatch(entry, halted))
            .buffer_unordered(self.options.workers.max(1))
            .collect()
            .await;
        entries.sort_by(|x, y| x.uid.cmp(&y.uid));

        let aborted = halted.load(Ordering::SeqCst)
            || entries
                .iter()
                .any(|e| matches!(e.outcome, Outcome::Skipped(SkipReason::Aborted)));
        let report = SyncReport {
            entries,
            duplicates: plan.duplicates,
            aborted,
        };

        let counts = report.counts();
        tracing::info!(
            status = %report.status(),
            created = counts.created,
            updated = counts.updated,
            deleted = counts.deleted,
            conflicted = counts.conflicted,
            failed = counts.failed,
            "sync finished"
        );
        Ok(report)
    }

    async fn dispatch(&self, entry: PlanEntry, halted: &AtomicBool) -> EntryReport {
        if self.abort.is_aborted() || halted.load(Ordering::SeqCst) {
            return EntryReport {
                uid: entry.uid,
                outcome: Outcome::Skipped(SkipReason::Aborted),
            };
        }

        let outcome = match self.execute(&entry).await {
            Ok(outcome) => outcome,
            Err(failure @ SyncFailure::Status(_)) => {
                tracing::error!(uid = %entry.uid, err = %failure, "status store failed, stopping");
                halted.store(true, Ordering::SeqCst);
                Outcome::Failed(failure)
            }
            Err(failure) => {
                tracing::warn!(uid = %entry.uid, err = %failure, "entry failed");
                Outcome::Failed(failure)
            }
        };
        EntryReport {
            uid: entry.uid,
            outcome,
        }
    }

    async fn execute(&self, entry: &PlanEntry) -> Result<Outcome, SyncFailure> {
        let action = match (entry.action, &entry.resolution) {
            (Action::Conflict, Some(Resolution::Resolved(action))) => *action,
            (Action::Conflict, Some(Resolution::Unresolved(reason))) => {
                tracing::warn!(uid = %entry.uid, %reason, "unresolved conflict");
                return Ok(Outcome::Skipped(SkipReason::UnresolvedConflict(
                    reason.clone(),
                )));
            }
            (Action::Conflict, None) => {
                return Ok(Outcome::Skipped(SkipReason::UnresolvedConflict(
                    "conflict was not resolved".into(),
                )));
            }
            (action, _) => action,
        };

        let Some(target) = action.target() else {
            if let (Some(fp), Some(a), Some(b)) = (&entry.agreed, &entry.a, &entry.b) {
                let record = StatusRecord::new(a.clone(), b.clone(), fp.clone());
                self.status.put(&entry.uid, &record).await?;
            }
            return Ok(Outcome::Skipped(SkipReason::Unchanged));
        };

        let action = match self.writable(action, target) {
            Ok(action) => action,
            Err(outcome) => return Ok(outcome),
        };
        let Some(target) = action.target() else {
            return Ok(Outcome::Skipped(SkipReason::Unchanged));
        };

        if action.is_create() {
            self.create(entry, action, target).await
        } else if action.is_update() {
            self.update(entry, action, target).await
        } else {
            self.delete(entry, action, target).await
        }
    }

    /// Applies the partial sync policy to writes against a read-only side.
    fn writable(&self, action: Action, target: Side) -> Result<Action, Outcome> {
        if !self.storage(target).read_only() {
            return Ok(action);
        }

        match self.options.partial_sync {
            PartialSync::Error => Err(Outcome::Failed(SyncFailure::ReadOnly(target))),
            PartialSync::Ignore => Err(Outcome::Skipped(SkipReason::ReadOnly(target))),
            PartialSync::Revert => match action.inverse() {
                Some(inverse) if !self.storage(target.other()).read_only() => {
                    tracing::debug!(%action, %inverse, "reverting write against read-only side");
                    Ok(inverse)
                }
                _ => Err(Outcome::Failed(SyncFailure::ReadOnly(target.other()))),
            },
        }
    }

    async fn create(
        &self,
        entry: &PlanEntry,
        action: Action,
        target: Side,
    ) -> Result<Outcome, SyncFailure> {
        let source = target.other();
        let src = Self::identity(entry, source)?;

        let (item, src_etag) = self
            .storage(source)
            .get(&src.href)
            .await
            .map_err(|e| SyncFailure::storage(source, e))?;
        let fp = fingerprint(item.raw(), self.options.normalization);

        let (href, etag) = self
            .storage(target)
            .upload(&item)
            .await
            .map_err(|e| SyncFailure::storage(target, e))?;

        let record = StatusRecord::from_sides(
            target,
            Identity::new(href.clone(), etag.clone()),
            Identity::new(src.href.clone(), src_etag),
            fp,
        );
        self.status.put(&entry.uid, &record).await?;

        tracing::info!(uid = %entry.uid, %action, %href, "created");
        self.notify(entry, action, target, href, Some(etag)).await;
        Ok(Outcome::Applied(action))
    }

    async fn update(
        &self,
        entry: &PlanEntry,
        action: Action,
        target: Side,
    ) -> Result<Outcome, SyncFailure> {
        let source = target.other();
        let src = Self::identity(entry, source)?;
        let dst = Self::identity(entry, target)?;

        let (item, src_etag) = self
            .storage(source)
            .get(&src.href)
            .await
            .map_err(|e| SyncFailure::storage(source, e))?;
        let fp = fingerprint(item.raw(), self.options.normalization);
        let src = Identity::new(src.href.clone(), src_etag);

        let dst_holds_content = entry
            .status
            .as_ref()
            .is_some_and(|r| r.fingerprint == fp && r.side(target) == dst);
        if dst_holds_content {
            tracing::debug!(uid = %entry.uid, "content unchanged, refreshing etags");
            let record = StatusRecord::from_sides(target, dst.clone(), src, fp);
            self.status.put(&entry.uid, &record).await?;
            return Ok(Outcome::Skipped(SkipReason::ContentUnchanged));
        }

        let etag = self
            .storage(target)
            .update(&dst.href, &item, &dst.etag)
            .await
            .map_err(|e| SyncFailure::storage(target, e))?;

        let record = StatusRecord::from_sides(
            target,
            Identity::new(dst.href.clone(), etag.clone()),
            src,
            fp,
        );
        self.status.put(&entry.uid, &record).await?;

        tracing::info!(uid = %entry.uid, %action, href = %dst.href, "updated");
        self.notify(entry, action, target, dst.href.clone(), Some(etag))
            .await;
        Ok(Outcome::Applied(action))
    }

    async fn delete(
        &self,
        entry: &PlanEntry,
        action: Action,
        target: Side,
    ) -> Result<Outcome, SyncFailure> {
        let dst = Self::identity(entry, target)?;

        match self.storage(target).delete(&dst.href, &dst.etag).await {
            Ok(()) => {}
            Err(StorageError::NotFound(_)) => {
                tracing::debug!(uid = %entry.uid, href = %dst.href, "already deleted");
            }
            Err(e) => return Err(SyncFailure::storage(target, e)),
        }
        self.status.delete(&entry.uid).await?;

        tracing::info!(uid = %entry.uid, %action, href = %dst.href, "deleted");
        self.notify(entry, action, target, dst.href.clone(), None)
            .await;
        Ok(Outcome::Applied(action))
    }

    async fn notify(
        &self,
        entry: &PlanEntry,
        action: Action,
        side: Side,
        href: Href,
        etag: Option<ETag>,
    ) {
        let Some(hook) = &self.hook else {
            return;
        };

        let event = WriteEvent {
            uid: entry.uid.clone(),
            action,
            side,
            location: self.storage(side).locate(&href),
            href,
            etag,
        };
        if let Err(err) = hook.after_write(&event).await {
            tracing::warn!(uid = %entry.uid, %err, "post-write hook failed");
        }
    }

    fn identity(entry: &PlanEntry, side: Side) -> Result<&Identity, SyncFailure> {
        entry.side(side).ok_or(SyncFailure::Missing(side))
    }

    fn storage(&self, side: Side) -> &dyn Storage {
        match side {
            Side::A => self.a.as_ref(),
            Side::B => self.b.as_ref(),
        }
    }
}
