// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Items and their identity.

use std::string::FromUtf8Error;

use crate::fingerprint::{Normalization, fingerprint};

/// A single synchronizable item, such as one iCalendar object or one vCard.
///
/// The raw content is kept untouched. The UID is read from the `UID`
/// property; items without one are identified by their content hash so they
/// can still be paired across storages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    raw: String,
    uid: Option<String>,
    ident: String,
}

impl Item {
    /// Creates an item from its raw text.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let uid = find_uid(&raw);
        let ident = match &uid {
            Some(uid) => uid.clone(),
            None => fingerprint(&raw, Normalization::LineEndings).to_string(),
        };
        Self { raw, uid, ident }
    }

    /// Creates an item from raw bytes, which must be valid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not UTF-8.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FromUtf8Error> {
        String::from_utf8(bytes).map(Self::new)
    }

    /// The value of the `UID` property, if present.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// The identifier used to pair this item across storages.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// The raw text of the item.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The raw content as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }
}

/// Splits content lines and joins folded continuation lines (RFC 5545 §3.1).
pub(crate) fn unfold_lines(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        match (line.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            _ => lines.push(line.to_string()),
        }
    }
    lines
}

/// Returns the property name of a content line, without parameters.
pub(crate) fn property_name(line: &str) -> Option<&str> {
    let (head, _) = line.split_once(':')?;
    let name = head.split(';').next().unwrap_or(head);
    Some(name.trim())
}

fn find_uid(raw: &str) -> Option<String> {
    unfold_lines(raw).into_iter().find_map(|line| {
        if !property_name(&line)?.eq_ignore_ascii_case("UID") {
            return None;
        }
        let (_, value) = line.split_once(':')?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
