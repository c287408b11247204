//! Reads a `.pptx` package back into a shape summary.
//!
//! Used to check what a rebuilt deck actually contains: slide order, shape
//! z-order, text runs and pictures.

use deck_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Text,
    Picture,
}

/// One shape of a slide, in EMU.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSummary {
    pub kind: ShapeKind,
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
    /// Paragraphs joined with `\n`.
    pub text: String,
    pub size_pt: Option<u32>,
    pub bold: bool,
}

impl ShapeSummary {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            x: 0,
            y: 0,
            cx: 0,
            cy: 0,
            text: String::new(),
            size_pt: None,
            bold: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideSummary {
    pub number: usize,
    pub shapes: Vec<ShapeSummary>,
}

impl SlideSummary {
    pub fn texts(&self) -> Vec<&str> {
        self.shapes
            .iter()
            .filter(|s| s.kind == ShapeKind::Text)
            .map(|s| s.text.as_str())
            .collect()
    }

    pub fn picture_count(&self) -> usize {
        self.shapes
            .iter()
            .filter(|s| s.kind == ShapeKind::Picture)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeckSummary {
    /// `p:sldSz` in EMU, when declared.
    pub slide_size: Option<(i64, i64)>,
    pub slides: Vec<SlideSummary>,
}

/// Summarize every slide of a `.pptx` package, in presentation order.
pub fn read_deck<R: Read + Seek>(reader: R) -> Result<DeckSummary> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

    let presentation = read_file_from_archive(&mut archive, "ppt/presentation.xml")?;
    let slide_size = read_slide_size(&presentation)?;

    let mut slides = Vec::new();
    for (idx, path) in slide_order(&mut archive)?.iter().enumerate() {
        let content = read_file_from_archive(&mut archive, path)?;
        slides.push(SlideSummary {
            number: idx + 1,
            shapes: extract_shapes(&content)?,
        });
    }

    Ok(DeckSummary { slide_size, slides })
}

/// Slide part paths ordered by the number in their relationship id or name.
fn slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let rels = read_file_from_archive(archive, "ppt/_rels/presentation.xml.rels")?;
    let mut slides: Vec<(String, Option<usize>)> = Vec::new();

    let mut reader = Reader::from_str(&rels);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let rel_type = attribute(e, b"Type").unwrap_or_default();
                let target = attribute(e, b"Target").unwrap_or_default();
                let id = attribute(e, b"Id").unwrap_or_default();

                if rel_type.ends_with("/slide") {
                    let order = extract_slide_number(&id).or_else(|| extract_slide_number(&target));
                    let path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("ppt/{}", target),
                    };
                    slides.push((path, order));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

fn read_slide_size(xml: &str) -> Result<Option<(i64, i64)>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldSz" =>
            {
                let cx = attribute(e, b"cx").and_then(|v| v.parse().ok());
                let cy = attribute(e, b"cy").and_then(|v| v.parse().ok());
                return Ok(cx.zip(cy));
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(Error::Xml(format!("Error parsing presentation: {}", e))),
            _ => {}
        }
    }
}

/// Collect text boxes and pictures in document (z) order.
fn extract_shapes(xml: &str) -> Result<Vec<ShapeSummary>> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut current: Option<ShapeSummary> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => current = Some(ShapeSummary::new(ShapeKind::Text)),
                b"pic" => current = Some(ShapeSummary::new(ShapeKind::Picture)),
                b"p" => {
                    if let Some(shape) = current.as_mut() {
                        if shape.size_pt.is_some() || !shape.text.is_empty() {
                            shape.text.push('\n');
                        }
                    }
                }
                b"t" => in_text = true,
                b"rPr" => read_run_properties(e, current.as_mut()),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"off" => {
                    if let Some(shape) = current.as_mut() {
                        shape.x = int_attribute(e, b"x");
                        shape.y = int_attribute(e, b"y");
                    }
                }
                b"ext" => {
                    if let Some(shape) = current.as_mut() {
                        shape.cx = int_attribute(e, b"cx");
                        shape.cy = int_attribute(e, b"cy");
                    }
                }
                b"rPr" => read_run_properties(e, current.as_mut()),
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_text {
                    if let Some(shape) = current.as_mut() {
                        let text = e.unescape().unwrap_or_default();
                        shape.text.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"pic" => {
                    if let Some(shape) = current.take() {
                        shapes.push(shape);
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error parsing slide: {}", e))),
            _ => {}
        }
    }

    Ok(shapes)
}

fn read_run_properties(e: &BytesStart<'_>, shape: Option<&mut ShapeSummary>) {
    let Some(shape) = shape else { return };
    if let Some(size) = attribute(e, b"sz").and_then(|v| v.parse::<u32>().ok()) {
        shape.size_pt = Some(size / 100);
    }
    if attribute(e, b"b").as_deref() == Some("1") {
        shape.bold = true;
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

fn int_attribute(e: &BytesStart<'_>, key: &[u8]) -> i64 {
    attribute(e, key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn read_file_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::Zip(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");
    let start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    s[start..].parse().ok()
}
