// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CalDAV/CardDAV processing.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;

use crate::error::DavError;

/// XML namespaces used in `CalDAV` and `CardDAV`.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// `CardDAV` namespace.
    pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";
}

/// Reads the text content of the element whose start tag was just read,
/// consuming everything up to and including its end tag.
///
/// Text of nested elements is concatenated. Entity references are resolved
/// and CDATA sections are taken verbatim.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn read_element_text<R: BufRead>(reader: &mut Reader<R>) -> Result<String, DavError> {
    let mut text = String::new();
    let mut depth = 1_usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Text(e) => text.push_str(&e.decode()?),
            Event::CData(e) => text.push_str(&e.decode()?),
            Event::GeneralRef(e) => match e.resolve_char_ref()? {
                Some(ch) => text.push(ch),
                None => {
                    let name = e.decode()?;
                    let resolved = resolve_predefined_entity(&name)
                        .ok_or_else(|| DavError::Xml(format!("unknown entity: &{name};")))?;
                    text.push_str(resolved);
                }
            },
            Event::Eof => return Err(DavError::Xml("Unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}
