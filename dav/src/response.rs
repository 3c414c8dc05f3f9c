// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsers for `WebDAV` multistatus bodies.

use quick_xml::events::Event;
use twinsync_core::{ETag, Href};

use crate::error::DavError;
use crate::xml::read_element_text;

/// `WebDAV` multistatus response.
#[derive(Debug, Clone)]
pub struct MultiStatusResponse {
    /// The response items.
    pub responses: Vec<ResponseItem>,
}

/// Individual response in multistatus.
#[derive(Debug, Clone)]
pub struct ResponseItem {
    /// The resource the response is about.
    pub href: Href,
    /// Property groups, one per status.
    pub prop_stats: Vec<PropStat>,
    /// Status of the whole resource, when the server sends no propstat.
    pub status: Option<String>,
}

/// Property stat with status and value.
#[derive(Debug, Clone)]
pub struct PropStat {
    /// The properties reported with this status.
    pub props: Properties,
    /// The status line, e.g. `HTTP/1.1 200 OK`.
    pub status: String,
}

impl PropStat {
    /// Whether the properties were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        status_code(&self.status) == Some(200)
    }
}

/// The `WebDAV` properties twinsync reads.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    /// `displayname`.
    pub display_name: Option<String>,
    /// `getetag`.
    pub get_etag: Option<ETag>,
    /// `getlastmodified`, as sent (an RFC 2822 date).
    pub get_last_modified: Option<String>,
    /// `calendar-data` or `address-data`.
    pub data: Option<String>,
    /// Whether `resourcetype` contains `collection`.
    pub is_collection: bool,
}

/// An item returned by a collection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResource {
    /// Server path of the item.
    pub href: Href,
    /// Current etag.
    pub etag: ETag,
    /// Raw iCalendar or vCard text.
    pub data: String,
}

impl MultiStatusResponse {
    /// Parses multistatus response from XML.
    ///
    /// # Errors
    ///
    /// Returns an error if XML parsing fails.
    pub fn from_xml(xml: &str) -> Result<Self, DavError> {
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().check_end_names = true;

        let mut responses = Vec::new();
        let mut current_response: Option<ResponseItem> = None;
        let mut current_props = Properties::default();
        let mut current_status: Option<String> = None;
        let mut in_propstat = false;
        let mut in_prop = false;

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::End(ref e) if e.name().local_name().into_inner() == b"multistatus" => break,
                Event::Eof => break,

                Event::Start(ref e) => match e.name().local_name().into_inner() {
                    b"response" => {
                        current_response = Some(ResponseItem {
                            href: Href::new(String::new()),
                            prop_stats: Vec::new(),
                            status: None,
                        });
                    }
                    b"href" if !in_propstat => {
                        let href = read_element_text(&mut reader)?;
                        if let Some(resp) = current_response.as_mut() {
                            resp.href = Href::new(href.trim().to_string());
                        }
                    }
                    b"propstat" if current_response.is_some() => {
                        in_propstat = true;
                        current_props = Properties::default();
                        current_status = None;
                    }
                    b"prop" if in_propstat => in_prop = true,
                    b"status" => {
                        let status = read_element_text(&mut reader)?.trim().to_string();
                        if in_propstat {
                            current_status = Some(status);
                        } else if let Some(resp) = current_response.as_mut() {
                            resp.status = Some(status);
                        }
                    }

                    b"displayname" if in_prop => {
                        current_props.display_name = Some(read_element_text(&mut reader)?);
                    }
                    b"getetag" if in_prop => {
                        let etag = read_element_text(&mut reader)?;
                        current_props.get_etag = Some(ETag::new(etag.trim().to_string()));
                    }
                    b"getlastmodified" if in_prop => {
                        let modified = read_element_text(&mut reader)?;
                        current_props.get_last_modified = Some(modified.trim().to_string());
                    }
                    b"calendar-data" | b"address-data" if in_prop => {
                        current_props.data = Some(read_element_text(&mut reader)?);
                    }
                    b"resourcetype" if in_prop => loop {
                        match reader.read_event_into(&mut buf)? {
                            Event::End(ref e)
                                if e.name().local_name().into_inner() == b"resourcetype" =>
                            {
                                break;
                            }
                            Event::Start(ref e) | Event::Empty(ref e) => {
                                if e.name().local_name().into_inner() == b"collection" {
                                    current_props.is_collection = true;
                                }
                            }
                            Event::Eof => {
                                return Err(DavError::Xml("Unexpected EOF".to_string()));
                            }
                            _ => {}
                        }
                    },
                    _ => {}
                },

                Event::End(ref e) => match e.name().local_name().into_inner() {
                    b"response" => {
                        if let Some(resp) = current_response.take() {
                            responses.push(resp);
                        }
                    }
                    b"propstat" if in_propstat => {
                        in_propstat = false;
                        if let Some(resp) = current_response.as_mut() {
                            resp.prop_stats.push(PropStat {
                                props: std::mem::take(&mut current_props),
                                status: current_status.take().unwrap_or_default(),
                            });
                        }
                    }
                    b"prop" => in_prop = false,
                    _ => {}
                },
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { responses })
    }

    /// Collects the items of a `calendar-query` or `addressbook-query`
    /// answer for `collection`. Only the collection itself may come without
    /// item data.
    ///
    /// # Errors
    ///
    /// Returns an error if a member comes without data or without an etag,
    /// so a partial answer is never taken for a complete listing.
    pub fn into_resources(self, collection: &str) -> Result<Vec<DavResource>, DavError> {
        let mut resources = Vec::new();

        for response in self.responses {
            if is_collection_response(&response, collection) {
                continue;
            }

            let props = response
                .prop_stats
                .into_iter()
                .filter(PropStat::is_ok)
                .map(|p| p.props)
                .find(|p| p.data.is_some());
            let Some(props) = props else {
                return Err(DavError::InvalidResponse(format!(
                    "no item data reported for {}{}",
                    response.href,
                    response
                        .status
                        .map(|s| format!(" ({s})"))
                        .unwrap_or_default()
                )));
            };

            let (Some(etag), Some(data)) = (props.get_etag, props.data) else {
                return Err(DavError::InvalidResponse(format!(
                    "no etag reported for {}",
                    response.href
                )));
            };
            resources.push(DavResource {
                href: response.href,
                etag,
                data,
            });
        }

        Ok(resources)
    }

    /// The first successfully reported `getlastmodified` value.
    #[must_use]
    pub fn last_modified(&self) -> Option<&str> {
        self.responses
            .iter()
            .flat_map(|r| &r.prop_stats)
            .filter(|p| p.is_ok())
            .find_map(|p| p.props.get_last_modified.as_deref())
    }
}

/// Whether `response` describes the queried collection rather than a member.
///
/// Servers may answer with a path or an absolute URL, with or without the
/// trailing slash.
fn is_collection_response(response: &ResponseItem, collection: &str) -> bool {
    let href = response.href.as_str().trim_end_matches('/');
    let collection = collection.trim_end_matches('/');
    let same_path = href == collection
        || href
            .strip_suffix(collection)
            .and_then(|origin| origin.split_once("://"))
            .is_some_and(|(_, host)| !host.is_empty() && !host.contains('/'));
    same_path
        || response
            .prop_stats
            .iter()
            .any(|p| p.is_ok() && p.props.is_collection)
}

/// Extracts the numeric code of a status line like `HTTP/1.1 404 Not Found`.
fn status_code(status: &str) -> Option<u16> {
    status.split_whitespace().nth(1)?.parse().ok()
}
