// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Post-write hooks, run after every successful create, update or delete.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::diff::Action;
use crate::types::{ETag, Href, Side};

/// A write the executor applied and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEvent {
    /// The UID of the item.
    pub uid: String,
    /// The applied action.
    pub action: Action,
    /// The side that was written to.
    pub side: Side,
    /// The href written to, or removed.
    pub href: Href,
    /// Where the written item lives, as given by [`Storage::locate`]: an
    /// absolute path for files, an URL for DAV collections.
    ///
    /// [`Storage::locate`]: crate::Storage::locate
    pub location: String,
    /// The resulting etag, `None` after a deletion.
    pub etag: Option<ETag>,
}

/// Errors of a post-write hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The hook could not be started.
    #[error("failed to run hook {program}: {source}")]
    Spawn {
        /// The program.
        program: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The hook exited unsuccessfully.
    #[error("hook {program} exited with {status}")]
    Exit {
        /// The program.
        program: String,
        /// The exit status.
        status: std::process::ExitStatus,
    },
}

/// Called after each applied write has been recorded in the status store.
///
/// A failing hook is logged and never undoes the write.
#[async_trait]
pub trait PostWriteHook: fmt::Debug + Send + Sync {
    /// Handles one applied write.
    async fn after_write(&self, event: &WriteEvent) -> Result<(), HookError>;
}

/// Runs an external program with the location of the written item as its
/// last argument.
///
/// The UID, action, side and storage href are passed as `TWINSYNC_UID`,
/// `TWINSYNC_ACTION`, `TWINSYNC_SIDE` and `TWINSYNC_HREF`.
#[derive(Debug, Clone)]
pub struct CommandHook {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandHook {
    /// Creates a hook running `program`, with `args` placed before the location.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl PostWriteHook for CommandHook {
    #[tracing::instrument(skip(self), fields(program = %self.program.display()))]
    async fn after_write(&self, event: &WriteEvent) -> Result<(), HookError> {
        let program = self.program.display().to_string();
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&event.location)
            .env("TWINSYNC_UID", &event.uid)
            .env("TWINSYNC_HREF", event.href.as_str())
            .env("TWINSYNC_ACTION", event.action.as_str())
            .env("TWINSYNC_SIDE", event.side.as_str())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| HookError::Spawn {
                program: program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(HookError::Exit { program, status })
        }
    }
}
