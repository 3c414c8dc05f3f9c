// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response};
use twinsync_core::{ETag, Href, Item, ItemRef, Storage, StorageError};
use uuid::Uuid;

use crate::config::{DavConfig, DavKind};
use crate::error::DavError;
use crate::http::{HttpClient, dav_method};
use crate::request::{CollectionQueryRequest, Prop, PropFindRequest};
use crate::response::MultiStatusResponse;

/// Longest resource name derived from an item identifier.
const MAX_NAME_LEN: usize = 200;

/// A `CalDAV` calendar or `CardDAV` address book on a remote server.
///
/// Every write is conditional: uploads send `If-None-Match: *`, updates and
/// deletes send `If-Match` with the etag the synchronizer last saw, so a
/// concurrent change on the server surfaces as a precondition failure
/// instead of being overwritten.
///
/// # Examples
///
/// ```rust,no_run
/// use twinsync_dav::{AuthMethod, DavConfig, DavKind, DavStorage};
///
/// let config = DavConfig {
///     url: "https://dav.example.com".to_string(),
///     collection: "/dav/calendars/user/work/".to_string(),
///     auth: AuthMethod::Basic {
///         username: "user".to_string(),
///         password: "pass".to_string(),
///     },
///     ..Default::default()
/// };
/// let storage = DavStorage::new(DavKind::CalDav, config)?;
/// # Ok::<(), twinsync_dav::DavError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DavStorage {
    http: Arc<HttpClient>,
    kind: DavKind,
    collection: String,
    read_only: bool,
    name: String,
}

impl DavStorage {
    /// Creates a storage for the collection described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or the HTTP client cannot be
    /// built.
    pub fn new(kind: DavKind, config: DavConfig) -> Result<Self, DavError> {
        if config.url.trim().is_empty() {
            return Err(DavError::Config("url must not be empty".to_string()));
        }

        let mut collection = config.collection.trim().to_string();
        if !collection.starts_with('/') {
            collection.insert(0, '/');
        }
        if !collection.ends_with('/') {
            collection.push('/');
        }

        let name = format!("{kind}:{}{collection}", config.url.trim_end_matches('/'));
        let read_only = config.read_only;
        let http = HttpClient::new(config)?;
        Ok(Self {
            http: Arc::new(http),
            kind,
            collection,
            read_only,
            name,
        })
    }

    /// The kind of collection.
    #[must_use]
    pub const fn kind(&self) -> DavKind {
        self.kind
    }

    /// Path of the collection on the server, always ending with `/`.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn href_for(&self, ident: &str) -> Href {
        let safe: String = ident
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || "_.-+@".contains(c) {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let stem = if safe.is_empty() || safe.len() > MAX_NAME_LEN || safe.starts_with('.') {
            Uuid::new_v4().simple().to_string()
        } else {
            safe
        };
        Href::new(format!("{}{stem}{}", self.collection, self.kind.fileext()))
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.read_only {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    async fn fetch(&self, href: &Href) -> Result<(Item, ETag), StorageError> {
        let resp = self
            .http
            .execute(self.http.build_request(Method::GET, href), href)
            .await?;

        let etag = HttpClient::extract_etag(&resp)
            .ok_or_else(|| DavError::InvalidResponse(format!("no ETag header for {href}")))?;
        let bytes = resp.bytes().await.map_err(DavError::from)?;
        let item = Item::from_bytes(bytes.to_vec())
            .map_err(|e| StorageError::InvalidItem(format!("{href}: {e}")))?;
        Ok((item, etag))
    }

    /// Uses the etag of a write response, or reads it back when the server
    /// did not send one.
    async fn etag_after_write(&self, href: &Href, resp: &Response) -> Result<ETag, StorageError> {
        if let Some(etag) = HttpClient::extract_etag(resp) {
            return Ok(etag);
        }
        tracing::debug!(%href, "write response without etag, fetching it");
        let (_, etag) = self.fetch(href).await?;
        Ok(etag)
    }

    fn put(&self, href: &Href, item: &Item) -> reqwest::RequestBuilder {
        self.http
            .build_request(Method::PUT, href)
            .header(CONTENT_TYPE, self.kind.content_type())
            .body(item.as_bytes().to_vec())
    }
}

#[async_trait]
impl Storage for DavStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    #[tracing::instrument(skip(self), fields(storage = %self.name))]
    async fn list(&self) -> Result<Vec<ItemRef>, StorageError> {
        let href = Href::new(self.collection.clone());
        let body = CollectionQueryRequest::new(self.kind).build()?;
        let req = self
            .http
            .xml_request(dav_method(b"REPORT")?, &self.collection, 1, body);
        let resp = self.http.execute(req, &href).await?;

        let xml = resp.text().await.map_err(DavError::from)?;
        let resources =
            MultiStatusResponse::from_xml(&xml)?.into_resources(&self.collection)?;

        let refs: Vec<_> = resources
            .into_iter()
            .map(|res| {
                let item = Item::new(res.data);
                ItemRef::new(item.ident(), res.href, res.etag)
            })
            .collect();
        tracing::debug!(count = refs.len(), "listed collection");
        Ok(refs)
    }

    #[tracing::instrument(skip(self), fields(storage = %self.name))]
    async fn get(&self, href: &Href) -> Result<(Item, ETag), StorageError> {
        self.fetch(href).await
    }

    #[tracing::instrument(skip(self, item), fields(storage = %self.name, ident = item.ident()))]
    async fn upload(&self, item: &Item) -> Result<(Href, ETag), StorageError> {
        self.check_writable()?;
        let href = self.href_for(item.ident());

        let req = HttpClient::if_none_match_any(self.put(&href, item));
        let resp = self
            .http
            .execute(req, &href)
            .await
            .map_err(|e| match e {
                DavError::PreconditionFailed(href) => StorageError::AlreadyExists(href),
                other => other.into(),
            })?;

        let etag = self.etag_after_write(&href, &resp).await?;
        tracing::debug!(%href, %etag, "uploaded item");
        Ok((href, etag))
    }

    #[tracing::instrument(skip(self, item), fields(storage = %self.name))]
    async fn update(&self, href: &Href, item: &Item, etag: &ETag) -> Result<ETag, StorageError> {
        self.check_writable()?;

        let req = HttpClient::if_match(self.put(href, item), etag);
        let resp = self
            .http
            .execute(req, href)
            .await
            .map_err(|e| precondition_to_mismatch(e, etag))?;

        self.etag_after_write(href, &resp).await
    }

    #[tracing::instrument(skip(self), fields(storage = %self.name))]
    async fn delete(&self, href: &Href, etag: &ETag) -> Result<(), StorageError> {
        self.check_writable()?;

        let req = HttpClient::if_match(self.http.build_request(Method::DELETE, href), etag);
        self.http
            .execute(req, href)
            .await
            .map_err(|e| precondition_to_mismatch(e, etag))?;
        Ok(())
    }

    fn locate(&self, href: &Href) -> String {
        self.http.full_url(href.as_str())
    }

    #[tracing::instrument(skip(self), fields(storage = %self.name))]
    async fn last_modified(&self, href: &Href) -> Result<Option<Timestamp>, StorageError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::GetLastModified);
        let req = self
            .http
            .xml_request(dav_method(b"PROPFIND")?, href, 0, propfind.build()?);
        let resp = self.http.execute(req, href).await?;

        let xml = resp.text().await.map_err(DavError::from)?;
        let multistatus = MultiStatusResponse::from_xml(&xml)?;
        let Some(value) = multistatus.last_modified() else {
            return Ok(None);
        };

        match jiff::fmt::rfc2822::parse(value) {
            Ok(zoned) => Ok(Some(zoned.timestamp())),
            Err(e) => {
                tracing::warn!(%href, value, "unparsable getlastmodified: {e}");
                Ok(None)
            }
        }
    }
}

fn precondition_to_mismatch(e: DavError, etag: &ETag) -> StorageError {
    match e {
        DavError::PreconditionFailed(href) => StorageError::EtagMismatch {
            href,
            expected: etag.clone(),
        },
        other => other.into(),
    }
}
