// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Item lifecycle tests: creation, update, deletion and idempotence.

use std::sync::Arc;

use twinsync_core::{
    Action, ConflictPolicy, ETag, Href, Identity, Outcome, RunStatus, SkipReason, StatusRecord,
    StatusStore, Fingerprint, Side,
};

use crate::common::{MemoryPair, RecordingHook, assert_converged, vcard, vevent};

#[tokio::test]
async fn lifecycle_create_on_b_from_empty_status() {
    // Arrange
    let pair = MemoryPair::new();
    pair.a.put(vevent("1", "v1")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);

    // Act
    let plan = sync.plan().await.unwrap();
    let report = sync.run().await.unwrap();

    // Assert
    assert_eq!(plan.entries.len(), 1);
    assert_eq!(plan.entries[0].action, Action::CreateOnB);
    assert!(matches!(
        report.outcome("1"),
        Some(Outcome::Applied(Action::CreateOnB))
    ));
    assert_eq!(report.status(), RunStatus::Clean);
    assert_eq!(report.counts().created, 1);

    let (href_b, _, etag_b) = pair.b.find("1").await.expect("B should hold UID 1");
    let record = pair.status.get("1").await.unwrap().expect("status recorded");
    assert_eq!(record.b, Identity::new(href_b, etag_b));
    assert_eq!(pair.status.all_uids().await.unwrap().len(), 1);

    let second = sync.plan().await.unwrap();
    assert_eq!(second.actions(), 0);
    assert!(second.is_empty());
}

#[tokio::test]
async fn lifecycle_update_b_from_a_refreshes_status() {
    // Arrange
    let pair = MemoryPair::new();
    pair.a.put(vevent("2", "first")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);
    sync.run().await.unwrap();

    let (_, e2) = pair.a.put(vevent("2", "second")).await;

    // Act
    let plan = sync.plan().await.unwrap();
    let report = sync.run().await.unwrap();

    // Assert
    assert_eq!(plan.entries[0].action, Action::UpdateBFromA);
    assert!(matches!(
        report.outcome("2"),
        Some(Outcome::Applied(Action::UpdateBFromA))
    ));

    let (_, item_b, new_etag_b) = pair.b.find("2").await.unwrap();
    assert!(item_b.raw().contains("SUMMARY:second"));
    let record = pair.status.get("2").await.unwrap().unwrap();
    assert_eq!(record.a.etag, e2);
    assert_eq!(record.b.etag, new_etag_b);
}

#[tokio::test]
async fn lifecycle_update_a_from_b() {
    let pair = MemoryPair::new();
    pair.b.put(vcard("card", "Ada")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);
    sync.run().await.unwrap();

    pair.b.put(vcard("card", "Ada Lovelace")).await;
    let report = sync.run().await.unwrap();

    assert!(matches!(
        report.outcome("card"),
        Some(Outcome::Applied(Action::UpdateAFromB))
    ));
    let (_, item_a, _) = pair.a.find("card").await.unwrap();
    assert!(item_a.raw().contains("FN:Ada Lovelace"));
}

#[tokio::test]
async fn lifecycle_second_run_is_idempotent() {
    // Arrange
    let pair = MemoryPair::new();
    pair.a.put(vevent("1", "one")).await;
    pair.a.put(vevent("2", "two")).await;
    pair.b.put(vevent("3", "three")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);
    sync.run().await.unwrap();
    let status_after_first = pair.status.snapshot().await.unwrap();

    // Act
    let report = sync.run().await.unwrap();

    // Assert
    assert_eq!(report.status(), RunStatus::Clean);
    assert_eq!(report.counts().unchanged, 3);
    assert!(report
        .entries
        .iter()
        .all(|e| matches!(e.outcome, Outcome::Skipped(SkipReason::Unchanged))));
    assert_eq!(pair.status.snapshot().await.unwrap(), status_after_first);
    assert_converged(&pair.a, &pair.b).await;
}

#[tokio::test]
async fn lifecycle_deletion_propagates_both_ways() {
    // Arrange
    let pair = MemoryPair::new();
    pair.a.put(vevent("keep", "k")).await;
    pair.a.put(vevent("gone-on-a", "x")).await;
    pair.a.put(vevent("gone-on-b", "y")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);
    sync.run().await.unwrap();

    pair.a.remove("gone-on-a").await.unwrap();
    pair.b.remove("gone-on-b").await.unwrap();

    // Act
    let report = sync.run().await.unwrap();

    // Assert
    assert!(matches!(
        report.outcome("gone-on-a"),
        Some(Outcome::Applied(Action::DeleteOnB))
    ));
    assert!(matches!(
        report.outcome("gone-on-b"),
        Some(Outcome::Applied(Action::DeleteOnA))
    ));
    assert_eq!(report.counts().deleted, 2);
    assert!(pair.b.find("gone-on-a").await.is_none());
    assert!(pair.a.find("gone-on-b").await.is_none());
    let uids = pair.status.all_uids().await.unwrap();
    assert_eq!(uids.into_iter().collect::<Vec<_>>(), vec!["keep".to_string()]);
}

#[tokio::test]
async fn lifecycle_edit_wins_over_delete() {
    let pair = MemoryPair::new();
    pair.a.put(vevent("1", "original")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);
    sync.run().await.unwrap();

    pair.a.remove("1").await.unwrap();
    pair.b.put(vevent("1", "edited on b")).await;
    let report = sync.run().await.unwrap();

    assert!(matches!(
        report.outcome("1"),
        Some(Outcome::Applied(Action::CreateOnA))
    ));
    let (_, item_a, _) = pair.a.find("1").await.unwrap();
    assert!(item_a.raw().contains("SUMMARY:edited on b"));
    assert_converged(&pair.a, &pair.b).await;
}

#[tokio::test]
async fn lifecycle_new_etag_with_same_content_only_refreshes_status() {
    // Arrange
    let pair = MemoryPair::new();
    pair.a.put(vevent("1", "same")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);
    sync.run().await.unwrap();
    let (_, etag_b_before) = {
        let (href, _, etag) = pair.b.find("1").await.unwrap();
        (href, etag)
    };

    let (_, new_etag_a) = pair.a.put(vevent("1", "same")).await;

    // Act
    let report = sync.run().await.unwrap();

    // Assert
    assert!(matches!(
        report.outcome("1"),
        Some(Outcome::Skipped(SkipReason::ContentUnchanged))
    ));
    let (_, _, etag_b_after) = pair.b.find("1").await.unwrap();
    assert_eq!(etag_b_after, etag_b_before, "no write must be issued");
    let record = pair.status.get("1").await.unwrap().unwrap();
    assert_eq!(record.a.etag, new_etag_a);
    assert_eq!(sync.plan().await.unwrap().actions(), 0);
}

#[tokio::test]
async fn lifecycle_equal_content_without_status_is_recorded() {
    let pair = MemoryPair::new();
    pair.a.put(vevent("1", "same")).await;
    pair.b.put(vevent("1", "same")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);

    let report = sync.run().await.unwrap();

    assert!(matches!(
        report.outcome("1"),
        Some(Outcome::Skipped(SkipReason::Unchanged))
    ));
    assert_eq!(report.status(), RunStatus::Clean);
    assert!(pair.status.get("1").await.unwrap().is_some());
    assert_eq!(sync.plan().await.unwrap().actions(), 0);
}

#[tokio::test]
async fn lifecycle_prunes_records_gone_from_both_sides() {
    // Arrange
    let pair = MemoryPair::new();
    pair.a.put(vevent("present", "p")).await;
    let sync = pair.synchronizer(ConflictPolicy::Fail);
    sync.run().await.unwrap();

    let ghost = StatusRecord::new(
        Identity::new(Href::from("ghost-a"), ETag::from("ea")),
        Identity::new(Href::from("ghost-b"), ETag::from("eb")),
        Fingerprint::new("00".to_string()),
    );
    pair.status.put("ghost", &ghost).await.unwrap();

    // Act
    let plan = sync.plan().await.unwrap();
    let report = sync.run().await.unwrap();

    // Assert
    assert_eq!(plan.stale, vec!["ghost".to_string()]);
    assert!(report.outcome("ghost").is_none());
    assert!(pair.status.get("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn lifecycle_hook_sees_applied_writes_only() {
    // Arrange
    let pair = MemoryPair::new();
    pair.a.put(vevent("new", "n")).await;
    let hook = Arc::new(RecordingHook::new());
    let sync = pair
        .synchronizer(ConflictPolicy::Fail)
        .with_hook(hook.clone());

    // Act
    sync.run().await.unwrap();
    sync.run().await.unwrap();

    // Assert
    let events = hook.events();
    assert_eq!(events.len(), 1);
    let (href_b, _, etag_b) = pair.b.find("new").await.unwrap();
    assert_eq!(events[0].uid, "new");
    assert_eq!(events[0].action, Action::CreateOnB);
    assert_eq!(events[0].side, Side::B);
    assert_eq!(events[0].location, href_b.as_str());
    assert_eq!(events[0].href, href_b);
    assert_eq!(events[0].etag, Some(etag_b));
}

#[tokio::test]
async fn lifecycle_failing_hook_keeps_write() {
    let pair = MemoryPair::new();
    pair.a.put(vevent("1", "one")).await;
    let sync = pair
        .synchronizer(ConflictPolicy::Fail)
        .with_hook(Arc::new(RecordingHook::failing()));

    let report = sync.run().await.unwrap();

    assert_eq!(report.status(), RunStatus::Clean);
    assert!(pair.b.find("1").await.is_some());
    assert!(pair.status.get("1").await.unwrap().is_some());
}
