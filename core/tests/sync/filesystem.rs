// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Filesystem storages with a SQLite status, across process-like restarts.

use std::sync::Arc;

use tokio::fs;
use twinsync_core::{
    Action, CommandHook, ConflictPolicy, FilesystemStorage, Outcome, RunStatus, Side, SqliteStatus,
    StatusStore, SyncError, Synchronizer,
};

use crate::common::{TempDirs, assert_converged, setup_temp_dirs, vevent};

async fn open(
    dirs: &TempDirs,
) -> (FilesystemStorage, FilesystemStorage, SqliteStatus) {
    let a = FilesystemStorage::open(&dirs.a_path, ".ics").await.unwrap();
    let b = FilesystemStorage::open(&dirs.b_path, ".ics").await.unwrap();
    let status = SqliteStatus::open(Some(&dirs.status_db())).await.unwrap();
    (a, b, status)
}

fn synchronizer(
    a: &FilesystemStorage,
    b: &FilesystemStorage,
    status: &SqliteStatus,
) -> Synchronizer {
    Synchronizer::new(
        Arc::new(a.clone()),
        Arc::new(b.clone()),
        Arc::new(status.clone()),
        ConflictPolicy::PreferA,
    )
}

#[tokio::test]
async fn filesystem_sync_survives_restart() {
    // Arrange
    let dirs = setup_temp_dirs().await.unwrap();
    fs::write(dirs.a_path.join("one.ics"), vevent("one", "1").raw())
        .await
        .unwrap();
    fs::write(dirs.b_path.join("two.ics"), vevent("two", "2").raw())
        .await
        .unwrap();

    // Act
    let (a, b, status) = open(&dirs).await;
    let report = synchronizer(&a, &b, &status).run().await.unwrap();
    status.close().await;

    // Assert
    assert_eq!(report.status(), RunStatus::Clean);
    assert_eq!(report.counts().created, 2);
    assert_eq!(
        fs::read_to_string(dirs.b_path.join("one.ics")).await.unwrap(),
        vevent("one", "1").raw()
    );
    assert_converged(&a, &b).await;

    // Reopen everything: the status remembers the previous run
    let (a, b, status) = open(&dirs).await;
    assert_eq!(status.all_uids().await.unwrap().len(), 2);
    let plan = synchronizer(&a, &b, &status).plan().await.unwrap();
    assert_eq!(plan.actions(), 0);
}

#[tokio::test]
async fn filesystem_external_edit_and_delete() {
    // Arrange
    let dirs = setup_temp_dirs().await.unwrap();
    let (a, b, status) = open(&dirs).await;
    for uid in ["edit", "drop", "keep"] {
        fs::write(dirs.a_path.join(format!("{uid}.ics")), vevent(uid, "v1").raw())
            .await
            .unwrap();
    }
    let sync = synchronizer(&a, &b, &status);
    sync.run().await.unwrap();

    // Edit through a rename, like an editor saving a file
    let tmp = dirs.b_path.join(".edit.tmp");
    fs::write(&tmp, vevent("edit", "v2").raw()).await.unwrap();
    fs::rename(&tmp, dirs.b_path.join("edit.ics")).await.unwrap();
    fs::remove_file(dirs.a_path.join("drop.ics")).await.unwrap();

    // Act
    let report = sync.run().await.unwrap();

    // Assert
    assert!(matches!(
        report.outcome("edit"),
        Some(Outcome::Applied(Action::UpdateAFromB))
    ));
    assert!(matches!(
        report.outcome("drop"),
        Some(Outcome::Applied(Action::DeleteOnB))
    ));
    assert!(!dirs.b_path.join("drop.ics").exists());
    let edited = fs::read_to_string(dirs.a_path.join("edit.ics")).await.unwrap();
    assert!(edited.contains("SUMMARY:v2"));
    assert_converged(&a, &b).await;
}

#[tokio::test]
async fn filesystem_duplicate_uid_is_reported_and_excluded() {
    // Arrange
    let dirs = setup_temp_dirs().await.unwrap();
    let (a, b, status) = open(&dirs).await;
    fs::write(dirs.a_path.join("first.ics"), vevent("dup", "1").raw())
        .await
        .unwrap();
    fs::write(dirs.a_path.join("second.ics"), vevent("dup", "2").raw())
        .await
        .unwrap();
    fs::write(dirs.a_path.join("unique.ics"), vevent("unique", "u").raw())
        .await
        .unwrap();

    // Act
    let report = synchronizer(&a, &b, &status).run().await.unwrap();

    // Assert
    assert_eq!(report.status(), RunStatus::CompletedWithErrors);
    assert_eq!(report.duplicates.len(), 1);
    let duplicate = &report.duplicates[0];
    assert_eq!(duplicate.side, Side::A);
    assert_eq!(duplicate.uid, "dup");
    assert_eq!(duplicate.hrefs.len(), 2);
    assert!(report.outcome("dup").is_none());
    assert!(matches!(
        report.outcome("unique"),
        Some(Outcome::Applied(Action::CreateOnB))
    ));
    assert!(!dirs.b_path.join("dup.ics").exists());
}

#[tokio::test]
async fn filesystem_unreadable_item_never_propagates_as_delete() {
    // Arrange
    let dirs = setup_temp_dirs().await.unwrap();
    let (a, b, status) = open(&dirs).await;
    for uid in ["x", "y"] {
        fs::write(dirs.a_path.join(format!("{uid}.ics")), vevent(uid, uid).raw())
            .await
            .unwrap();
    }
    let sync = synchronizer(&a, &b, &status);
    sync.run().await.unwrap();

    // Someone saves x.ics as Latin-1
    let mut latin1 = vevent("x", "caf").raw().as_bytes().to_vec();
    let at = latin1.len() - "\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n".len();
    latin1.insert(at, 0xE9);
    fs::write(dirs.a_path.join("x.ics"), latin1).await.unwrap();

    // Act
    let result = sync.run().await;

    // Assert
    assert!(matches!(
        result,
        Err(SyncError::Listing { side: Side::A, .. })
    ));
    assert!(dirs.b_path.join("x.ics").exists());
    assert!(dirs.b_path.join("y.ics").exists());
    assert_eq!(status.all_uids().await.unwrap().len(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn filesystem_hook_receives_written_file_path() {
    // Arrange
    let dirs = setup_temp_dirs().await.unwrap();
    let (a, b, status) = open(&dirs).await;
    let event = vevent("hooked", "h");
    fs::write(dirs.a_path.join("hooked.ics"), event.raw())
        .await
        .unwrap();
    let out = dirs.state_dir.join("hook.out");
    let script = format!(r#"cat "$1" > "{}""#, out.display());
    let hook = CommandHook::new("sh", vec!["-c".into(), script, "hook".into()]);
    let sync = synchronizer(&a, &b, &status).with_hook(Arc::new(hook));

    // Act
    let report = sync.run().await.unwrap();

    // Assert
    assert_eq!(report.status(), RunStatus::Clean);
    assert_eq!(fs::read_to_string(&out).await.unwrap(), event.raw());
}
