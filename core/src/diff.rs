// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Classification of every UID into the action that converges both sides.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use futures::future;

use crate::fingerprint::{Fingerprint, Normalization, fingerprint};
use crate::resolve::Resolution;
use crate::status::StatusRecord;
use crate::storage::{ItemRef, Storage};
use crate::types::{Href, Identity, Side};

/// What the executor must do for one UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Both sides agree with the status.
    Unchanged,
    /// Copy the item from A to B, where it does not exist yet.
    CreateOnB,
    /// Copy the item from B to A, where it does not exist yet.
    CreateOnA,
    /// Overwrite B with A's copy.
    UpdateBFromA,
    /// Overwrite A with B's copy.
    UpdateAFromB,
    /// Remove the item from B, it was deleted on A.
    DeleteOnB,
    /// Remove the item from A, it was deleted on B.
    DeleteOnA,
    /// Both sides changed since the last sync.
    Conflict,
}

impl Action {
    /// Name of the action, as used in logs and hooks.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Unchanged => "unchanged",
            Action::CreateOnB => "create_on_b",
            Action::CreateOnA => "create_on_a",
            Action::UpdateBFromA => "update_b_from_a",
            Action::UpdateAFromB => "update_a_from_b",
            Action::DeleteOnB => "delete_on_b",
            Action::DeleteOnA => "delete_on_a",
            Action::Conflict => "conflict",
        }
    }

    /// The side this action writes to, if any.
    #[must_use]
    pub const fn target(self) -> Option<Side> {
        match self {
            Action::CreateOnB | Action::UpdateBFromA | Action::DeleteOnB => Some(Side::B),
            Action::CreateOnA | Action::UpdateAFromB | Action::DeleteOnA => Some(Side::A),
            Action::Unchanged | Action::Conflict => None,
        }
    }

    /// The action that restores the target side from the other side instead.
    ///
    /// Returns `None` for actions that write nothing.
    #[must_use]
    pub const fn inverse(self) -> Option<Self> {
        match self {
            Action::CreateOnB => Some(Action::DeleteOnA),
            Action::CreateOnA => Some(Action::DeleteOnB),
            Action::UpdateBFromA => Some(Action::UpdateAFromB),
            Action::UpdateAFromB => Some(Action::UpdateBFromA),
            Action::DeleteOnB => Some(Action::CreateOnA),
            Action::DeleteOnA => Some(Action::CreateOnB),
            Action::Unchanged | Action::Conflict => None,
        }
    }

    /// Whether the action creates an item.
    #[must_use]
    pub const fn is_create(self) -> bool {
        matches!(self, Action::CreateOnA | Action::CreateOnB)
    }

    /// Whether the action overwrites an item.
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(self, Action::UpdateAFromB | Action::UpdateBFromA)
    }

    /// Whether the action removes an item.
    #[must_use]
    pub const fn is_delete(self) -> bool {
        matches!(self, Action::DeleteOnA | Action::DeleteOnB)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One UID of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// The UID.
    pub uid: String,
    /// The classified action.
    pub action: Action,
    /// Identity on side A, if present there.
    pub a: Option<Identity>,
    /// Identity on side B, if present there.
    pub b: Option<Identity>,
    /// The status record from the last sync, if any.
    pub status: Option<StatusRecord>,
    /// Set when both sides were found to hold the same content; the
    /// executor records it with the current identities.
    pub agreed: Option<Fingerprint>,
    /// How a conflict was decided, once resolved.
    pub resolution: Option<Resolution>,
}

impl PlanEntry {
    /// The identity on `side`.
    #[must_use]
    pub const fn side(&self, side: Side) -> Option<&Identity> {
        match side {
            Side::A => self.a.as_ref(),
            Side::B => self.b.as_ref(),
        }
    }
}

/// A UID listed more than once on one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// The side with the duplicated UID.
    pub side: Side,
    /// The UID.
    pub uid: String,
    /// Every href carrying the UID.
    pub hrefs: Vec<Href>,
}

/// The classified state of a pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Entries, ordered by UID.
    pub entries: Vec<PlanEntry>,
    /// UIDs with a status record but absent from both sides.
    pub stale: Vec<String>,
    /// UIDs excluded from the plan because they are not unique.
    pub duplicates: Vec<Duplicate>,
}

impl Plan {
    /// Number of entries that require work.
    #[must_use]
    pub fn actions(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action != Action::Unchanged)
            .count()
    }

    /// Whether nothing needs to be done.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions() == 0 && self.stale.is_empty()
    }
}

/// Classifies every UID from the two listings and the status snapshot.
///
/// Entries classified as [`Action::Conflict`] have not been checked for
/// equal content yet, see [`break_ties`].
#[must_use]
pub fn classify(
    listing_a: &[ItemRef],
    listing_b: &[ItemRef],
    status: &BTreeMap<String, StatusRecord>,
) -> Plan {
    let mut duplicates = Vec::new();
    let a = index(Side::A, listing_a, &mut duplicates);
    let b = index(Side::B, listing_b, &mut duplicates);
    let excluded: BTreeSet<&str> = duplicates.iter().map(|d| d.uid.as_str()).collect();

    let uids: BTreeSet<&str> = a
        .keys()
        .chain(b.keys())
        .chain(status.keys())
        .map(String::as_str)
        .filter(|uid| !excluded.contains(uid))
        .collect();

    let mut plan = Plan {
        duplicates,
        ..Plan::default()
    };
    for uid in uids {
        let in_a = a.get(uid).cloned();
        let in_b = b.get(uid).cloned();
        let record = status.get(uid);

        let action = match (&in_a, &in_b, record) {
            (None, None, _) => {
                plan.stale.push(uid.to_string());
                continue;
            }
            (Some(ia), Some(ib), record) => {
                let changed_a = changed(ia, record.map(|r| &r.a));
                let changed_b = changed(ib, record.map(|r| &r.b));
                match (changed_a, changed_b) {
                    (false, false) => Action::Unchanged,
                    (true, false) => Action::UpdateBFromA,
                    (false, true) => Action::UpdateAFromB,
                    (true, true) => Action::Conflict,
                }
            }
            (Some(_), None, None) => Action::CreateOnB,
            (None, Some(_), None) => Action::CreateOnA,
            (Some(ia), None, Some(r)) => {
                if changed(ia, Some(&r.a)) {
                    Action::CreateOnB
                } else {
                    Action::DeleteOnA
                }
            }
            (None, Some(ib), Some(r)) => {
                if changed(ib, Some(&r.b)) {
                    Action::CreateOnA
                } else {
                    Action::DeleteOnB
                }
            }
        };

        plan.entries.push(PlanEntry {
            uid: uid.to_string(),
            action,
            a: in_a,
            b: in_b,
            status: record.cloned(),
            agreed: None,
            resolution: None,
        });
    }
    plan
}

/// Demotes conflicts to [`Action::Unchanged`] where both sides hold the
/// same normalized content.
///
/// Both items are fetched; a failed fetch leaves the conflict in place.
pub async fn break_ties(
    plan: &mut Plan,
    a: &dyn Storage,
    b: &dyn Storage,
    normalization: Normalization,
) {
    for entry in &mut plan.entries {
        if entry.action != Action::Conflict {
            continue;
        }
        let (Some(ia), Some(ib)) = (&entry.a, &entry.b) else {
            continue;
        };

        let (fetched_a, fetched_b) = future::join(a.get(&ia.href), b.get(&ib.href)).await;
        let ((item_a, etag_a), (item_b, etag_b)) = match (fetched_a, fetched_b) {
            (Ok(fa), Ok(fb)) => (fa, fb),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(uid = %entry.uid, %err, "cannot compare conflicting items");
                continue;
            }
        };

        let fp_a = fingerprint(item_a.raw(), normalization);
        if fp_a == fingerprint(item_b.raw(), normalization) {
            tracing::debug!(uid = %entry.uid, "conflicting items have equal content");
            entry.action = Action::Unchanged;
            entry.a = Some(Identity::new(ia.href.clone(), etag_a));
            entry.b = Some(Identity::new(ib.href.clone(), etag_b));
            entry.agreed = Some(fp_a);
        }
    }
}

fn index(
    side: Side,
    listing: &[ItemRef],
    duplicates: &mut Vec<Duplicate>,
) -> BTreeMap<String, Identity> {
    let mut grouped: BTreeMap<&str, Vec<&ItemRef>> = BTreeMap::new();
    for item in listing {
        grouped.entry(item.uid.as_str()).or_default().push(item);
    }

    let mut index = BTreeMap::new();
    for (uid, refs) in grouped {
        if let [only] = refs.as_slice() {
            index.insert(
                uid.to_string(),
                Identity::new(only.href.clone(), only.etag.clone()),
            );
        } else {
            tracing::warn!(%side, uid, count = refs.len(), "duplicate UID in listing");
            duplicates.push(Duplicate {
                side,
                uid: uid.to_string(),
                hrefs: refs.iter().map(|r| r.href.clone()).collect(),
            });
        }
    }
    index
}

fn changed(current: &Identity, recorded: Option<&Identity>) -> bool {
    recorded.is_none_or(|r| r.href != current.href || r.etag != current.etag)
}
