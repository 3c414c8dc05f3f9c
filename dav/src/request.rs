// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for `WebDAV` operations.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::config::DavKind;
use crate::error::DavError;
use crate::xml::ns;

/// PROPFIND request builder.
#[derive(Debug)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

/// Properties to request in PROPFIND.
#[derive(Debug, Clone, Copy)]
pub enum Prop {
    /// Display name.
    DisplayName,
    /// Resource type.
    ResourceType,
    /// `ETag`.
    GetETag,
    /// Last modification time.
    GetLastModified,
}

impl Prop {
    const fn name(self) -> &'static str {
        match self {
            Self::DisplayName => "displayname",
            Self::ResourceType => "resourcetype",
            Self::GetETag => "getetag",
            Self::GetLastModified => "getlastmodified",
        }
    }
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <D:propfind xmlns:D="DAV:">
        let mut propfind = BytesStart::new("D:propfind");
        propfind.push_attribute(("xmlns:D", ns::DAV));
        writer.write_event(Event::Start(propfind))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        for prop in &self.props {
            write_empty(&mut writer, &format!("D:{}", prop.name()))?;
        }
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        writer.write_event(Event::End(BytesEnd::new("D:propfind")))?;

        into_string(writer)
    }
}

impl Default for PropFindRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// `calendar-query` or `addressbook-query` REPORT asking for every item of a
/// collection together with its etag and data.
#[derive(Debug, Clone, Copy)]
pub struct CollectionQueryRequest {
    kind: DavKind,
}

impl CollectionQueryRequest {
    /// Creates a query for the given kind of collection.
    #[must_use]
    pub const fn new(kind: DavKind) -> Self {
        Self { kind }
    }

    /// Builds the XML body for the REPORT request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let (root, namespace, data) = match self.kind {
            DavKind::CalDav => ("C:calendar-query", ns::CALDAV, "C:calendar-data"),
            DavKind::CardDav => ("C:addressbook-query", ns::CARDDAV, "C:address-data"),
        };

        // <C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
        let mut query = BytesStart::new(root);
        query.push_attribute(("xmlns:D", ns::DAV));
        query.push_attribute(("xmlns:C", namespace));
        writer.write_event(Event::Start(query))?;

        // <D:prop>
        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        write_empty(&mut writer, "D:getetag")?;
        write_empty(&mut writer, data)?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        // <C:filter> is mandatory for calendar-query and matches everything
        // when it only names VCALENDAR; an empty addressbook filter matches
        // every card.
        match self.kind {
            DavKind::CalDav => {
                writer.write_event(Event::Start(BytesStart::new("C:filter")))?;
                let mut comp_filter = BytesStart::new("C:comp-filter");
                comp_filter.push_attribute(("name", "VCALENDAR"));
                writer.write_event(Event::Empty(comp_filter))?;
                writer.write_event(Event::End(BytesEnd::new("C:filter")))?;
            }
            DavKind::CardDav => {
                writer.write_event(Event::Empty(BytesStart::new("C:filter")))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new(root)))?;

        into_string(writer)
    }
}

fn write_empty(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str) -> Result<(), DavError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> Result<String, DavError> {
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
}
