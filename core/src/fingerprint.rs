// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Content fingerprints, the fallback equality signal when etags disagree.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::item::{property_name, unfold_lines};

/// Properties that servers tend to rewrite on every store.
const VOLATILE_PROPERTIES: &[&str] = &[
    "PRODID",
    "DTSTAMP",
    "LAST-MODIFIED",
    "REV",
    "X-RADICALE-NAME",
];

/// How item content is normalized before hashing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Hash the raw bytes as they are.
    Exact,
    /// Unfold lines, unify line endings, strip trailing whitespace and blank
    /// lines.
    #[default]
    LineEndings,
    /// Like [`Normalization::LineEndings`], and also ignore properties that
    /// are rewritten by servers without a real edit.
    IgnoreVolatile,
}

/// Hash of normalized item content, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already computed fingerprint, e.g. one read from the status store.
    #[must_use]
    pub const fn new(hex: String) -> Self {
        Self(hex)
    }

    /// Returns the hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Computes the fingerprint of raw item content.
#[must_use]
pub fn fingerprint(raw: &str, normalization: Normalization) -> Fingerprint {
    let digest = match normalization {
        Normalization::Exact => Sha256::digest(raw.as_bytes()),
        _ => Sha256::digest(normalize(raw, normalization).as_bytes()),
    };
    Fingerprint(hex::encode(digest))
}

/// Applies the given normalization to raw item content.
#[must_use]
pub fn normalize(raw: &str, normalization: Normalization) -> String {
    if normalization == Normalization::Exact {
        return raw.to_string();
    }

    let raw = raw.replace("\r\n", "\n").replace('\r', "\n");
    let lines = unfold_lines(&raw)
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.is_empty())
        .filter(|line| {
            normalization != Normalization::IgnoreVolatile
                || !property_name(line).is_some_and(|name| {
                    VOLATILE_PROPERTIES
                        .iter()
                        .any(|p| p.eq_ignore_ascii_case(name))
                })
        })
        .collect::<Vec<_>>();
    lines.join("\n")
}
