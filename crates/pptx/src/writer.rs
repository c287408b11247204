//! PPTX (Office Open XML) writer.
//!
//! Produces a minimal but complete presentation package: one master, one
//! blank layout, one theme and one part per slide. Shape geometry is taken
//! in EMU and rounded to whole units on output.

use crate::package::{
    self, app_properties_xml, content_types_xml, core_properties_xml, rel_type, relationships_xml,
    Relationship, NS_DRAWING, NS_PRESENTATION, NS_RELATIONSHIPS,
};
use deck_core::mapping::Canvas;
use deck_core::xml::XmlWriter;
use deck_core::{Error, Placement, Result};
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Hundredths of a point per point, the unit of `a:rPr/@sz`.
const FONT_SIZE_SCALE: u32 = 100;

/// A word-wrapped text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub placement: Placement,
    pub text: String,
    pub size_pt: u32,
    pub bold: bool,
}

/// A PNG picture stretched over its placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub placement: Placement,
    pub png: Vec<u8>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Text(TextBox),
    Picture(Picture),
}

/// Shapes of one slide, in z-order (first is bottom-most).
#[derive(Debug, Clone, Default)]
pub struct Slide {
    shapes: Vec<Shape>,
}

impl Slide {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slide holding one picture that covers the whole canvas.
    pub fn full_bleed(png: Vec<u8>, canvas: &Canvas) -> Self {
        let mut slide = Self::new();
        slide.add_picture(
            Placement {
                left: 0.0,
                top: 0.0,
                width: canvas.width,
                height: canvas.height,
            },
            png,
            "Background",
        );
        slide
    }

    pub fn add_text(&mut self, placement: Placement, text: &str, size_pt: u32, bold: bool) {
        self.shapes.push(Shape::Text(TextBox {
            placement,
            text: text.to_string(),
            size_pt,
            bold,
        }));
    }

    pub fn add_picture(&mut self, placement: Placement, png: Vec<u8>, name: &str) {
        self.shapes.push(Shape::Picture(Picture {
            placement,
            png,
            name: name.to_string(),
        }));
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn text_count(&self) -> usize {
        self.shapes
            .iter()
            .filter(|s| matches!(s, Shape::Text(_)))
            .count()
    }

    pub fn picture_count(&self) -> usize {
        self.shapes.len() - self.text_count()
    }
}

/// Accumulates slides and writes them as a `.pptx` package.
pub struct PptxWriter {
    canvas: Canvas,
    title: String,
    slides: Vec<Slide>,
}

impl PptxWriter {
    /// Create a writer for the standard 16:9 canvas.
    pub fn new() -> Self {
        Self {
            canvas: Canvas::widescreen_emu(),
            title: "Rebuilt presentation".to_string(),
            slides: Vec::new(),
        }
    }

    /// Use another page size; dimensions are in EMU.
    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Write the package to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write(file)?;
        log::info!("Wrote {} slide(s) to {}", self.slides.len(), path.display());
        Ok(())
    }

    /// Write the package into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write the package to any seekable sink.
    pub fn write<W: Write + Seek>(&self, sink: W) -> Result<W> {
        let mut zip = ZipWriter::new(sink);
        let xml_options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let media_options = FileOptions::default().compression_method(CompressionMethod::Stored);

        let slide_count = self.slides.len();
        put_part(&mut zip, "[Content_Types].xml", &content_types_xml(slide_count)?, xml_options)?;
        put_part(
            &mut zip,
            "_rels/.rels",
            &relationships_xml(&[
                Relationship::new("rId1", package::REL_OFFICE_DOCUMENT, "ppt/presentation.xml"),
                Relationship::new("rId2", package::REL_CORE_PROPERTIES, "docProps/core.xml"),
                Relationship::new("rId3", package::REL_EXTENDED_PROPERTIES, "docProps/app.xml"),
            ])?,
            xml_options,
        )?;
        put_part(&mut zip, "docProps/core.xml", &core_properties_xml(&self.title)?, xml_options)?;
        put_part(&mut zip, "docProps/app.xml", &app_properties_xml(slide_count)?, xml_options)?;

        put_part(&mut zip, "ppt/presentation.xml", &self.presentation_xml()?, xml_options)?;
        put_part(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            &relationships_xml(&self.presentation_relationships())?,
            xml_options,
        )?;

        put_part(
            &mut zip,
            "ppt/slideMasters/slideMaster1.xml",
            package::SLIDE_MASTER_XML.as_bytes(),
            xml_options,
        )?;
        put_part(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &relationships_xml(&[
                Relationship::new(
                    "rId1",
                    rel_type("slideLayout"),
                    "../slideLayouts/slideLayout1.xml",
                ),
                Relationship::new("rId2", rel_type("theme"), "../theme/theme1.xml"),
            ])?,
            xml_options,
        )?;
        put_part(
            &mut zip,
            "ppt/slideLayouts/slideLayout1.xml",
            package::SLIDE_LAYOUT_XML.as_bytes(),
            xml_options,
        )?;
        put_part(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &relationships_xml(&[Relationship::new(
                "rId1",
                rel_type("slideMaster"),
                "../slideMasters/slideMaster1.xml",
            )])?,
            xml_options,
        )?;
        put_part(&mut zip, "ppt/theme/theme1.xml", package::THEME_XML.as_bytes(), xml_options)?;

        let mut media_index = 0;
        for (idx, slide) in self.slides.iter().enumerate() {
            let number = idx + 1;
            let mut relationships = vec![Relationship::new(
                "rId1",
                rel_type("slideLayout"),
                "../slideLayouts/slideLayout1.xml",
            )];

            // Picture shapes reference media through rId2, rId3, ... in order.
            for shape in &slide.shapes {
                if let Shape::Picture(picture) = shape {
                    media_index += 1;
                    let media = format!("image{}.png", media_index);
                    relationships.push(Relationship::new(
                        format!("rId{}", relationships.len() + 1),
                        rel_type("image"),
                        format!("../media/{}", media),
                    ));
                    put_part(
                        &mut zip,
                        &format!("ppt/media/{}", media),
                        &picture.png,
                        media_options,
                    )?;
                }
            }

            put_part(
                &mut zip,
                &format!("ppt/slides/slide{}.xml", number),
                &slide_xml(slide)?,
                xml_options,
            )?;
            put_part(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                &relationships_xml(&relationships)?,
                xml_options,
            )?;
        }

        zip.finish()
            .map_err(|e| Error::Zip(format!("Failed to finish archive: {}", e)))
    }

    fn presentation_relationships(&self) -> Vec<Relationship> {
        let mut relationships = vec![Relationship::new(
            "rId1",
            rel_type("slideMaster"),
            "slideMasters/slideMaster1.xml",
        )];
        for number in 1..=self.slides.len() {
            relationships.push(Relationship::new(
                format!("rId{}", number + 1),
                rel_type("slide"),
                format!("slides/slide{}.xml", number),
            ));
        }
        relationships.push(Relationship::new(
            format!("rId{}", self.slides.len() + 2),
            rel_type("theme"),
            "theme/theme1.xml",
        ));
        relationships
    }

    fn presentation_xml(&self) -> Result<Vec<u8>> {
        let mut xml = XmlWriter::new();
        xml.declaration()?;
        xml.start(
            "p:presentation",
            &[
                ("xmlns:a", NS_DRAWING),
                ("xmlns:r", NS_RELATIONSHIPS),
                ("xmlns:p", NS_PRESENTATION),
                ("saveSubsetFonts", "1"),
            ],
        )?;

        xml.start("p:sldMasterIdLst", &[])?;
        xml.empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
        xml.end("p:sldMasterIdLst")?;

        if !self.slides.is_empty() {
            xml.start("p:sldIdLst", &[])?;
            for number in 1..=self.slides.len() {
                xml.empty(
                    "p:sldId",
                    &[
                        ("id", &(255 + number).to_string()),
                        ("r:id", &format!("rId{}", number + 1)),
                    ],
                )?;
            }
            xml.end("p:sldIdLst")?;
        }

        xml.empty(
            "p:sldSz",
            &[
                ("cx", &emu(self.canvas.width).to_string()),
                ("cy", &emu(self.canvas.height).to_string()),
            ],
        )?;
        xml.empty("p:notesSz", &[("cx", "6858000"), ("cy", "9144000")])?;
        xml.end("p:presentation")?;
        Ok(xml.into_bytes())
    }
}

impl Default for PptxWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Round a canvas length to whole EMU.
fn put_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    data: &[u8],
    options: FileOptions,
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| Error::Zip(format!("Failed to add '{}': {}", name, e)))?;
    zip.write_all(data)?;
    Ok(())
}

fn emu(value: f64) -> i64 {
    value.round() as i64
}

fn slide_xml(slide: &Slide) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new();
    xml.declaration()?;
    xml.start(
        "p:sld",
        &[
            ("xmlns:a", NS_DRAWING),
            ("xmlns:r", NS_RELATIONSHIPS),
            ("xmlns:p", NS_PRESENTATION),
        ],
    )?;
    xml.start("p:cSld", &[])?;
    xml.start("p:spTree", &[])?;

    xml.start("p:nvGrpSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
    xml.empty("p:cNvGrpSpPr", &[])?;
    xml.empty("p:nvPr", &[])?;
    xml.end("p:nvGrpSpPr")?;
    xml.start("p:grpSpPr", &[])?;
    xml.start("a:xfrm", &[])?;
    xml.empty("a:off", &[("x", "0"), ("y", "0")])?;
    xml.empty("a:ext", &[("cx", "0"), ("cy", "0")])?;
    xml.empty("a:chOff", &[("x", "0"), ("y", "0")])?;
    xml.empty("a:chExt", &[("cx", "0"), ("cy", "0")])?;
    xml.end("a:xfrm")?;
    xml.end("p:grpSpPr")?;

    let mut next_rel = 2;
    for (idx, shape) in slide.shapes.iter().enumerate() {
        // id 1 belongs to the group shape.
        let shape_id = (idx + 2).to_string();
        match shape {
            Shape::Text(text) => write_text_box(&mut xml, &shape_id, text)?,
            Shape::Picture(picture) => {
                write_picture(&mut xml, &shape_id, &format!("rId{}", next_rel), picture)?;
                next_rel += 1;
            }
        }
    }

    xml.end("p:spTree")?;
    xml.end("p:cSld")?;
    xml.start("p:clrMapOvr", &[])?;
    xml.empty("a:masterClrMapping", &[])?;
    xml.end("p:clrMapOvr")?;
    xml.end("p:sld")?;
    Ok(xml.into_bytes())
}

fn write_transform(xml: &mut XmlWriter, placement: &Placement) -> Result<()> {
    xml.start("a:xfrm", &[])?;
    xml.empty(
        "a:off",
        &[
            ("x", &emu(placement.left).to_string()),
            ("y", &emu(placement.top).to_string()),
        ],
    )?;
    xml.empty(
        "a:ext",
        &[
            ("cx", &emu(placement.width).max(1).to_string()),
            ("cy", &emu(placement.height).max(1).to_string()),
        ],
    )?;
    xml.end("a:xfrm")?;
    xml.start("a:prstGeom", &[("prst", "rect")])?;
    xml.empty("a:avLst", &[])?;
    xml.end("a:prstGeom")
}

fn write_text_box(xml: &mut XmlWriter, shape_id: &str, text: &TextBox) -> Result<()> {
    xml.start("p:sp", &[])?;
    xml.start("p:nvSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", shape_id), ("name", &format!("TextBox {}", shape_id))])?;
    xml.empty("p:cNvSpPr", &[("txBox", "1")])?;
    xml.empty("p:nvPr", &[])?;
    xml.end("p:nvSpPr")?;

    xml.start("p:spPr", &[])?;
    write_transform(xml, &text.placement)?;
    xml.empty("a:noFill", &[])?;
    xml.end("p:spPr")?;

    xml.start("p:txBody", &[])?;
    xml.empty("a:bodyPr", &[("wrap", "square"), ("rtlCol", "0")])?;
    xml.empty("a:lstStyle", &[])?;

    let size = (text.size_pt.max(1) * FONT_SIZE_SCALE).to_string();
    let mut run_properties = vec![("lang", "en-US"), ("sz", size.as_str())];
    if text.bold {
        run_properties.push(("b", "1"));
    }
    run_properties.push(("dirty", "0"));

    let mut lines: Vec<&str> = text.text.lines().collect();
    if lines.is_empty() {
        lines.push("");
    }
    for line in lines {
        xml.start("a:p", &[])?;
        if !line.is_empty() {
            xml.start("a:r", &[])?;
            xml.empty("a:rPr", &run_properties)?;
            xml.text_element("a:t", &[], line)?;
            xml.end("a:r")?;
        }
        xml.empty("a:endParaRPr", &[("lang", "en-US"), ("sz", size.as_str()), ("dirty", "0")])?;
        xml.end("a:p")?;
    }

    xml.end("p:txBody")?;
    xml.end("p:sp")
}

fn write_picture(
    xml: &mut XmlWriter,
    shape_id: &str,
    rel_id: &str,
    picture: &Picture,
) -> Result<()> {
    xml.start("p:pic", &[])?;
    xml.start("p:nvPicPr", &[])?;
    xml.empty("p:cNvPr", &[("id", shape_id), ("name", &picture.name)])?;
    xml.start("p:cNvPicPr", &[])?;
    xml.empty("a:picLocks", &[("noChangeAspect", "1")])?;
    xml.end("p:cNvPicPr")?;
    xml.empty("p:nvPr", &[])?;
    xml.end("p:nvPicPr")?;

    xml.start("p:blipFill", &[])?;
    xml.empty("a:blip", &[("r:embed", rel_id)])?;
    xml.start("a:stretch", &[])?;
    xml.empty("a:fillRect", &[])?;
    xml.end("a:stretch")?;
    xml.end("p:blipFill")?;

    xml.start("p:spPr", &[])?;
    write_transform(xml, &picture.placement)?;
    xml.end("p:spPr")?;
    xml.end("p:pic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{read_deck, ShapeKind};
    use std::io::Read;
    use zip::ZipArchive;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn placement(left: f64, top: f64, width: f64, height: f64) -> Placement {
        Placement {
            left,
            top,
            width,
            height,
        }
    }

    fn sample_writer() -> PptxWriter {
        let mut writer = PptxWriter::new().with_title("Quarterly review");
        let canvas = *writer.canvas();

        let mut first = Slide::full_bleed(PNG.to_vec(), &canvas);
        first.add_text(placement(914_400.0, 457_200.4, 3_000_000.0, 600_000.0), "Agenda", 32, true);
        first.add_text(
            placement(914_400.0, 1_500_000.0, 3_000_000.0, 900_000.0),
            "One\nTwo & <three>",
            18,
            false,
        );
        first.add_picture(
            placement(5_000_000.0, 2_000_000.0, 800_000.0, 800_000.0),
            PNG.to_vec(),
            "Icon 1",
        );
        writer.add_slide(first);
        writer.add_slide(Slide::full_bleed(PNG.to_vec(), &canvas));
        writer
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_package_contains_required_parts() {
        let bytes = sample_writer().to_bytes().unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();

        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "docProps/app.xml",
            "ppt/presentation.xml",
            "ppt/_rels/presentation.xml.rels",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/slides/_rels/slide1.xml.rels",
            "ppt/media/image1.png",
            "ppt/media/image3.png",
        ] {
            assert!(names.contains(&part), "missing {}", part);
        }
        assert!(!names.contains(&"ppt/media/image4.png"));
    }

    #[test]
    fn test_presentation_declares_canvas_and_slides() {
        let bytes = sample_writer().to_bytes().unwrap();
        let presentation = read_part(&bytes, "ppt/presentation.xml");
        assert!(presentation.contains("<p:sldSz cx=\"9144000\" cy=\"5143500\"/>"));
        assert!(presentation.contains("<p:sldId id=\"256\" r:id=\"rId2\"/>"));
        assert!(presentation.contains("<p:sldId id=\"257\" r:id=\"rId3\"/>"));

        let rels = read_part(&bytes, "ppt/slides/_rels/slide1.xml.rels");
        assert!(rels.contains("Target=\"../media/image1.png\""));
        assert!(rels.contains("Id=\"rId3\""));
    }

    #[test]
    fn test_text_box_markup() {
        let bytes = sample_writer().to_bytes().unwrap();
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains("<a:off x=\"914400\" y=\"457200\"/>"));
        assert!(slide.contains("sz=\"3200\" b=\"1\""));
        assert!(slide.contains("<a:bodyPr wrap=\"square\""));
        assert!(slide.contains("<a:t>Two &amp; &lt;three&gt;</a:t>"));
        assert!(slide.contains("<a:blip r:embed=\"rId2\"/>"));
        assert!(slide.contains("<a:blip r:embed=\"rId3\"/>"));
    }

    #[test]
    fn test_read_back_preserves_order_and_content() {
        let bytes = sample_writer().to_bytes().unwrap();
        let deck = read_deck(Cursor::new(bytes)).unwrap();

        assert_eq!(deck.slide_size, Some((9_144_000, 5_143_500)));
        assert_eq!(deck.slides.len(), 2);

        let kinds: Vec<ShapeKind> = deck.slides[0].shapes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ShapeKind::Picture, ShapeKind::Text, ShapeKind::Text, ShapeKind::Picture]
        );
        assert_eq!(deck.slides[0].texts(), vec!["Agenda", "One\nTwo & <three>"]);
        assert_eq!(deck.slides[0].shapes[1].size_pt, Some(32));
        assert!(deck.slides[0].shapes[1].bold);
        assert!(!deck.slides[0].shapes[2].bold);
        assert_eq!(deck.slides[1].picture_count(), 1);
    }

    #[test]
    fn test_control_characters_are_stripped() {
        let mut writer = PptxWriter::new();
        let mut slide = Slide::new();
        slide.add_text(placement(0.0, 0.0, 100.0, 100.0), "Tab\u{0}\u{1b}le", 12, false);
        writer.add_slide(slide);

        let bytes = writer.to_bytes().unwrap();
        let deck = read_deck(Cursor::new(bytes)).unwrap();
        assert_eq!(deck.slides[0].texts(), vec!["Table"]);
    }

    #[test]
    fn test_empty_presentation_is_valid() {
        let bytes = PptxWriter::new().to_bytes().unwrap();
        let deck = read_deck(Cursor::new(bytes)).unwrap();
        assert!(deck.slides.is_empty());
    }

    #[test]
    fn test_degenerate_extent_written_as_one_emu() {
        let mut writer = PptxWriter::new();
        let mut slide = Slide::new();
        slide.add_picture(placement(10.0, 10.0, 0.2, 0.0), PNG.to_vec(), "Dot");
        writer.add_slide(slide);

        let bytes = writer.to_bytes().unwrap();
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains("<a:ext cx=\"1\" cy=\"1\"/>"));
    }
}
