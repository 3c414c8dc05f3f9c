// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Conflict resolution: turns a conflicting plan entry into a one-way
//! update according to the pair's policy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::{Action, PlanEntry};
use crate::storage::Storage;
use crate::types::Side;

/// How conflicting edits are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Side A wins.
    PreferA,
    /// Side B wins.
    PreferB,
    /// The side with the later modification time wins.
    PreferNewer,
    /// Conflicts are never resolved automatically.
    Fail,
}

impl ConflictPolicy {
    /// Name of the policy, as written in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConflictPolicy::PreferA => "prefer_a",
            ConflictPolicy::PreferB => "prefer_b",
            ConflictPolicy::PreferNewer => "prefer_newer",
            ConflictPolicy::Fail => "fail",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The conflict turns into this action.
    Resolved(Action),
    /// The conflict stays, with the reason why.
    Unresolved(String),
}

/// Decides a conflicting entry according to `policy`.
///
/// Entries that are not conflicts resolve to their own action.
pub async fn resolve(
    entry: &PlanEntry,
    policy: ConflictPolicy,
    a: &dyn Storage,
    b: &dyn Storage,
) -> Resolution {
    if entry.action != Action::Conflict {
        return Resolution::Resolved(entry.action);
    }

    match policy {
        ConflictPolicy::PreferA => Resolution::Resolved(winner(Side::A)),
        ConflictPolicy::PreferB => Resolution::Resolved(winner(Side::B)),
        ConflictPolicy::Fail => Resolution::Unresolved("conflict resolution is disabled".into()),
        ConflictPolicy::PreferNewer => prefer_newer(entry, a, b).await,
    }
}

async fn prefer_newer(entry: &PlanEntry, a: &dyn Storage, b: &dyn Storage) -> Resolution {
    let (Some(ia), Some(ib)) = (&entry.a, &entry.b) else {
        return Resolution::Unresolved("item is missing on one side".into());
    };

    let (ta, tb) = match (
        a.last_modified(&ia.href).await,
        b.last_modified(&ib.href).await,
    ) {
        (Ok(Some(ta)), Ok(Some(tb))) => (ta, tb),
        (Ok(_), Ok(_)) => {
            return Resolution::Unresolved("modification time is unknown".into());
        }
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!(uid = %entry.uid, %err, "cannot read modification time");
            return Resolution::Unresolved(format!("cannot read modification time: {err}"));
        }
    };

    match ta.cmp(&tb) {
        std::cmp::Ordering::Greater => Resolution::Resolved(winner(Side::A)),
        std::cmp::Ordering::Less => Resolution::Resolved(winner(Side::B)),
        std::cmp::Ordering::Equal => {
            Resolution::Unresolved("both sides have the same modification time".into())
        }
    }
}

const fn winner(side: Side) -> Action {
    match side {
        Side::A => Action::UpdateBFromA,
        Side::B => Action::UpdateAFromB,
    }
}
