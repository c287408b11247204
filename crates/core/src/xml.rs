//! Thin event writer over `quick-xml` used for SVG overlays and OOXML parts.

use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;

/// Streaming XML writer with escaped attributes and sanitized text.
pub struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    /// Write `<?xml version="1.0" encoding="UTF-8" standalone="yes"?>`.
    pub fn declaration(&mut self) -> Result<()> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.write(Event::Start(element(name, attributes)))
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.write(Event::Empty(element(name, attributes)))
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Write escaped character data, dropping characters XML 1.0 forbids.
    pub fn text(&mut self, text: &str) -> Result<()> {
        let text = sanitize_xml_text(text);
        self.write(Event::Text(BytesText::new(&text)))
    }

    /// Write `<name ...>text</name>`.
    pub fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<()> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    pub fn into_string(self) -> Result<String> {
        String::from_utf8(self.into_bytes()).map_err(|e| Error::Xml(e.to_string()))
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Xml(e.to_string()))
    }
}

fn element<'a>(name: &'a str, attributes: &[(&str, &str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        let value = sanitize_xml_text(value);
        start.push_attribute((*key, value.as_ref()));
    }
    start
}

/// Remove characters that are not allowed in XML 1.0 documents.
pub fn sanitize_xml_text(text: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
    }

    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| allowed(*c)).collect())
    }
}
