// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Which flavour of `WebDAV` collection a storage talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DavKind {
    /// A `CalDAV` calendar collection holding iCalendar objects.
    CalDav,
    /// A `CardDAV` address book holding vCards.
    CardDav,
}

impl DavKind {
    /// File extension used for items uploaded to the collection.
    #[must_use]
    pub const fn fileext(self) -> &'static str {
        match self {
            Self::CalDav => ".ics",
            Self::CardDav => ".vcf",
        }
    }

    /// Media type sent with uploaded items.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::CalDav => "text/calendar; charset=utf-8",
            Self::CardDav => "text/vcard; charset=utf-8",
        }
    }
}

impl fmt::Display for DavKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CalDav => write!(f, "caldav"),
            Self::CardDav => write!(f, "carddav"),
        }
    }
}

/// `WebDAV` authentication method.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Basic authentication (username/password).
    #[serde(rename = "basic")]
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
    /// Bearer token authentication (OAuth).
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

/// Connection settings of one `CalDAV` or `CardDAV` collection.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DavConfig {
    /// Base URL of the server, e.g. `https://dav.example.com`.
    #[serde(alias = "base_url")]
    pub url: String,
    /// Path of the collection on the server (e.g., /dav/calendars/user/work/).
    pub collection: String,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Refuse every write to the collection.
    #[serde(default)]
    pub read_only: bool,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("twinsync-dav/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for DavConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            collection: String::new(),
            auth: AuthMethod::default(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            read_only: false,
        }
    }
}
