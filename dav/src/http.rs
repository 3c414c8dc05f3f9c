// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and `ETag` handling.

use reqwest::header::{CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use twinsync_core::{ETag, Href};

use crate::config::{AuthMethod, DavConfig};
use crate::error::DavError;

/// Media type of `WebDAV` request bodies.
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Builds one of the `WebDAV` extension methods, such as `PROPFIND`.
///
/// # Errors
///
/// Returns an error if `name` is not a valid method token.
pub fn dav_method(name: &[u8]) -> Result<Method, DavError> {
    Method::from_bytes(name).map_err(|e| DavError::Http(format!("Invalid method: {e}")))
}

/// HTTP client for `WebDAV` operations.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: DavConfig,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: DavConfig) -> Result<Self, DavError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    /// Turns a server path into an absolute URL.
    pub fn full_url(&self, href: &str) -> String {
        format!("{}{href}", self.config.url.trim_end_matches('/'))
    }

    /// Builds a request with authentication headers.
    pub fn build_request(&self, method: Method, href: &str) -> RequestBuilder {
        let mut req = self.client.request(method, self.full_url(href));

        match &self.config.auth {
            AuthMethod::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }

        req
    }

    /// Builds a `PROPFIND` or `REPORT` request carrying an XML body.
    pub fn xml_request(&self, method: Method, href: &str, depth: u8, body: String) -> RequestBuilder {
        self.build_request(method, href)
            .header("Depth", depth.to_string())
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(body)
    }

    /// Executes a request and checks for HTTP errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns an error status code.
    pub async fn execute(&self, req: RequestBuilder, href: &Href) -> Result<Response, DavError> {
        let resp = req.send().await?;

        match resp.status() {
            StatusCode::OK
            | StatusCode::CREATED
            | StatusCode::NO_CONTENT
            | StatusCode::MULTI_STATUS => Ok(resp),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(DavError::NotFound(href.clone())),
            StatusCode::PRECONDITION_FAILED => Err(DavError::PreconditionFailed(href.clone())),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Err(DavError::Auth(status.to_string()))
            }
            status => {
                let text = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response".to_string());
                Err(DavError::Http(format!("{status}: {text}")))
            }
        }
    }

    /// Adds If-Match header for conditional updates.
    pub fn if_match(req: RequestBuilder, etag: &ETag) -> RequestBuilder {
        req.header(IF_MATCH, etag.as_str())
    }

    /// Adds `If-None-Match: *` so a `PUT` never replaces an existing resource.
    pub fn if_none_match_any(req: RequestBuilder) -> RequestBuilder {
        req.header(IF_NONE_MATCH, "*")
    }

    /// Extracts `ETag` from response headers, if the server sent one.
    pub fn extract_etag(resp: &Response) -> Option<ETag> {
        resp.headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| ETag::new(s.to_string()))
    }
}
