// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CalDAV` (RFC 4791) and `CardDAV` (RFC 6352) collections as twinsync
//! storages.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(clippy::similar_names, clippy::single_match_else, clippy::match_bool)]

mod config;
mod error;
mod http;
mod request;
mod response;
mod storage;
mod xml;

pub use crate::config::{AuthMethod, DavConfig, DavKind};
pub use crate::error::DavError;
pub use crate::request::{CollectionQueryRequest, Prop, PropFindRequest};
pub use crate::response::{DavResource, MultiStatusResponse, PropStat, Properties, ResponseItem};
pub use crate::storage::DavStorage;
