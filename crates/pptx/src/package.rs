//! Package-level OOXML parts: content types, relationships, master, layout,
//! theme and document properties.

use deck_core::xml::XmlWriter;
use deck_core::Result;

pub const NS_PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
pub const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";

/// Relationship type URI for a part kind such as `slide` or `image`.
pub fn rel_type(kind: &str) -> String {
    format!("{}/{}", REL_BASE, kind)
}

/// One entry of a `.rels` part.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        rel_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.into(),
            target: target.into(),
        }
    }
}

pub fn relationships_xml(relationships: &[Relationship]) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new();
    xml.declaration()?;
    xml.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    for rel in relationships {
        xml.empty(
            "Relationship",
            &[
                ("Id", &rel.id),
                ("Type", &rel.rel_type),
                ("Target", &rel.target),
            ],
        )?;
    }
    xml.end("Relationships")?;
    Ok(xml.into_bytes())
}

pub fn content_types_xml(slide_count: usize) -> Result<Vec<u8>> {
    const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";

    let mut xml = XmlWriter::new();
    xml.declaration()?;
    xml.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    xml.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    xml.empty("Default", &[("Extension", "png"), ("ContentType", "image/png")])?;

    let mut overrides = vec![
        (
            "/ppt/presentation.xml".to_string(),
            format!("{}.presentation.main+xml", PML),
        ),
        (
            "/ppt/slideMasters/slideMaster1.xml".to_string(),
            format!("{}.slideMaster+xml", PML),
        ),
        (
            "/ppt/slideLayouts/slideLayout1.xml".to_string(),
            format!("{}.slideLayout+xml", PML),
        ),
        (
            "/ppt/theme/theme1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.theme+xml".to_string(),
        ),
        (
            "/docProps/core.xml".to_string(),
            "application/vnd.openxmlformats-package.core-properties+xml".to_string(),
        ),
        (
            "/docProps/app.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.extended-properties+xml".to_string(),
        ),
    ];
    for number in 1..=slide_count {
        overrides.push((
            format!("/ppt/slides/slide{}.xml", number),
            format!("{}.slide+xml", PML),
        ));
    }

    for (part, content_type) in &overrides {
        xml.empty("Override", &[("PartName", part), ("ContentType", content_type)])?;
    }
    xml.end("Types")?;
    Ok(xml.into_bytes())
}

pub fn core_properties_xml(title: &str) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new();
    xml.declaration()?;
    xml.start(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    xml.text_element("dc:title", &[], title)?;
    xml.text_element("dc:creator", &[], env!("CARGO_PKG_NAME"))?;
    xml.end("cp:coreProperties")?;
    Ok(xml.into_bytes())
}

pub fn app_properties_xml(slide_count: usize) -> Result<Vec<u8>> {
    let mut xml = XmlWriter::new();
    xml.declaration()?;
    xml.start(
        "Properties",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
        )],
    )?;
    xml.text_element("Application", &[], "deck-rebuild")?;
    xml.text_element("Slides", &[], &slide_count.to_string())?;
    xml.text_element("AppVersion", &[], "16.0000")?;
    xml.end("Properties")?;
    Ok(xml.into_bytes())
}

/// The one slide master every slide layout hangs off.
pub const SLIDE_MASTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#;

/// A blank layout: slides place every shape themselves.
pub const SLIDE_LAYOUT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#;

pub const THEME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types_list_every_slide() {
        let xml = String::from_utf8(content_types_xml(3).unwrap()).unwrap();
        assert!(xml.contains("PartName=\"/ppt/slides/slide1.xml\""));
        assert!(xml.contains("PartName=\"/ppt/slides/slide3.xml\""));
        assert!(!xml.contains("slide4.xml"));
        assert!(xml.contains("Extension=\"png\""));
    }

    #[test]
    fn test_relationships_xml() {
        let rels = [Relationship::new(
            "rId1",
            rel_type("slideLayout"),
            "../slideLayouts/slideLayout1.xml",
        )];
        let xml = String::from_utf8(relationships_xml(&rels).unwrap()).unwrap();
        assert!(xml.contains(
            "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout\" Target=\"../slideLayouts/slideLayout1.xml\"/>"
        ));
    }

    #[test]
    fn test_core_properties_escape_title() {
        let xml = String::from_utf8(core_properties_xml("Q3 <draft> & notes").unwrap()).unwrap();
        assert!(xml.contains("<dc:title>Q3 &lt;draft&gt; &amp; notes</dc:title>"));
    }
}
