// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Safety tests: mass deletion guard, read-only sides and aborts.

use std::sync::Arc;

use twinsync_core::{
    Action, AbortHandle, ConflictPolicy, Outcome, PartialSync, RunStatus, Side, SkipReason,
    StatusStore, SyncError, SyncFailure, SyncOptions, Synchronizer,
};

use crate::common::{MemoryPair, RecordingHook, vevent};

async fn synced_pair(uids: &[&str]) -> MemoryPair {
    let pair = MemoryPair::new();
    for uid in uids {
        pair.a.put(vevent(uid, "base")).await;
    }
    pair.synchronizer(ConflictPolicy::Fail).run().await.unwrap();
    pair
}

fn read_only_a(pair: &MemoryPair, partial_sync: PartialSync) -> Synchronizer {
    Synchronizer::new(
        Arc::new(pair.a.clone().with_read_only(true)),
        Arc::new(pair.b.clone()),
        Arc::new(pair.status.clone()),
        ConflictPolicy::Fail,
    )
    .with_options(SyncOptions {
        partial_sync,
        ..SyncOptions::default()
    })
}

#[tokio::test]
async fn safety_refuses_to_empty_other_side() {
    // Arrange
    let pair = synced_pair(&["1", "2"]).await;
    pair.b.remove("1").await.unwrap();
    pair.b.remove("2").await.unwrap();

    // Act
    let result = pair.synchronizer(ConflictPolicy::Fail).run().await;

    // Assert
    assert!(matches!(
        result,
        Err(SyncError::StorageEmpty { side: Side::B })
    ));
    assert_eq!(pair.a.len().await, 2, "nothing may be deleted");
}

#[tokio::test]
async fn safety_force_delete_overrides_guard() {
    let pair = synced_pair(&["1", "2"]).await;
    pair.b.remove("1").await.unwrap();
    pair.b.remove("2").await.unwrap();
    let sync = pair.synchronizer_with(
        ConflictPolicy::Fail,
        SyncOptions {
            force_delete: true,
            ..SyncOptions::default()
        },
    );

    let report = sync.run().await.unwrap();

    assert_eq!(report.counts().deleted, 2);
    assert!(pair.a.is_empty().await);
    assert!(pair.status.all_uids().await.unwrap().is_empty());
}

#[tokio::test]
async fn safety_read_only_side_fails_by_default() {
    let pair = synced_pair(&["1"]).await;
    pair.b.put(vevent("1", "edited on b")).await;

    let report = read_only_a(&pair, PartialSync::Error).run().await.unwrap();

    assert!(matches!(
        report.outcome("1"),
        Some(Outcome::Failed(SyncFailure::ReadOnly(Side::A)))
    ));
    assert_eq!(report.status(), RunStatus::CompletedWithErrors);
}

#[tokio::test]
async fn safety_read_only_side_ignored() {
    let pair = synced_pair(&["1"]).await;
    pair.b.put(vevent("1", "edited on b")).await;
    let status_before = pair.status.get("1").await.unwrap();

    let report = read_only_a(&pair, PartialSync::Ignore).run().await.unwrap();

    assert!(matches!(
        report.outcome("1"),
        Some(Outcome::Skipped(SkipReason::ReadOnly(Side::A)))
    ));
    assert_eq!(report.counts().skipped, 1);
    assert_eq!(pair.status.get("1").await.unwrap(), status_before);
    let (_, item_a, _) = pair.a.find("1").await.unwrap();
    assert!(item_a.raw().contains("SUMMARY:base"));
}

#[tokio::test]
async fn safety_read_only_side_reverted() {
    // Arrange
    let pair = synced_pair(&["edited", "deleted"]).await;
    pair.b.put(vevent("edited", "edited on b")).await;
    pair.b.remove("deleted").await.unwrap();
    pair.b.put(vevent("created", "new on b")).await;

    // Act
    let report = read_only_a(&pair, PartialSync::Revert).run().await.unwrap();

    // Assert
    assert!(matches!(
        report.outcome("edited"),
        Some(Outcome::Applied(Action::UpdateBFromA))
    ));
    assert!(matches!(
        report.outcome("deleted"),
        Some(Outcome::Applied(Action::CreateOnB))
    ));
    assert!(matches!(
        report.outcome("created"),
        Some(Outcome::Applied(Action::DeleteOnB))
    ));

    let (_, item_b, _) = pair.b.find("edited").await.unwrap();
    assert!(item_b.raw().contains("SUMMARY:base"));
    assert!(pair.b.find("deleted").await.is_some());
    assert!(pair.b.find("created").await.is_none());
    assert_eq!(pair.a.len().await, 2);
}

#[tokio::test]
async fn safety_abort_before_run_skips_everything() {
    let pair = MemoryPair::new();
    pair.a.put(vevent("1", "one")).await;
    pair.a.put(vevent("2", "two")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);
    sync.abort_handle().abort();

    let report = sync.run().await.unwrap();

    assert_eq!(report.status(), RunStatus::Aborted);
    assert_eq!(report.counts().skipped, 2);
    assert!(pair.b.is_empty().await);
    assert!(pair.status.all_uids().await.unwrap().is_empty());
}

#[tokio::test]
async fn safety_abort_lets_in_flight_entry_finish() {
    // Arrange
    let pair = MemoryPair::new();
    for uid in ["1", "2", "3"] {
        pair.a.put(vevent(uid, uid)).await;
    }
    let abort = AbortHandle::new();
    let sync = pair
        .synchronizer_with(
            ConflictPolicy::Fail,
            SyncOptions {
                workers: 1,
                ..SyncOptions::default()
            },
        )
        .with_abort_handle(abort.clone())
        .with_hook(Arc::new(RecordingHook::aborting(abort)));

    // Act
    let report = sync.run().await.unwrap();

    // Assert
    assert_eq!(report.status(), RunStatus::Aborted);
    assert_eq!(report.counts().created, 1);
    assert_eq!(report.counts().skipped, 2);
    assert_eq!(pair.b.len().await, 1);
    assert_eq!(pair.status.all_uids().await.unwrap().len(), 1);
}
