//! Diagnostic overlay: element boxes drawn over the source image as SVG.

use crate::error::Result;
use crate::types::{Category, ElementSet, ImageSize};
use crate::xml::XmlWriter;

/// Characters of an element label drawn next to its box.
const LABEL_CHARS: usize = 30;

/// Height reserved above a box for its label, in pixels.
const LABEL_OFFSET: f64 = 20.0;

/// Stroke color for each category.
pub fn category_color(category: Category) -> (u8, u8, u8) {
    match category {
        Category::Text => (0, 100, 255),
        Category::Icon => (0, 200, 0),
        Category::Chart => (255, 0, 0),
    }
}

#[derive(Debug, Clone)]
pub struct OverlayOptions {
    pub show_labels: bool,
    pub line_width: u32,
    pub font_size: u32,
    /// Image drawn underneath the boxes (path or URL, as written).
    pub background_href: Option<String>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            show_labels: true,
            line_width: 3,
            font_size: 16,
            background_href: None,
        }
    }
}

impl OverlayOptions {
    pub fn with_background(mut self, href: impl Into<String>) -> Self {
        self.background_href = Some(href.into());
        self
    }

    pub fn with_labels(mut self, show: bool) -> Self {
        self.show_labels = show;
        self
    }
}

/// Render one rectangle per element, colored by category.
pub fn render_overlay_svg(
    elements: &ElementSet,
    size: ImageSize,
    options: &OverlayOptions,
) -> Result<String> {
    let width = size.width.to_string();
    let height = size.height.to_string();
    let view_box = format!("0 0 {} {}", size.width, size.height);

    let mut xml = XmlWriter::new();
    xml.start(
        "svg",
        &[
            ("xmlns", "http://www.w3.org/2000/svg"),
            ("width", &width),
            ("height", &height),
            ("viewBox", &view_box),
        ],
    )?;

    if let Some(href) = &options.background_href {
        xml.empty(
            "image",
            &[
                ("href", href),
                ("x", "0"),
                ("y", "0"),
                ("width", &width),
                ("height", &height),
            ],
        )?;
    }

    let line_width = options.line_width.to_string();
    let font_size = options.font_size.to_string();

    for element in elements.iter() {
        let bbox = element.bbox();
        let (r, g, b) = category_color(element.category());
        let color = format!("rgb({},{},{})", r, g, b);

        xml.start("g", &[("class", element.category().as_str())])?;
        xml.empty(
            "rect",
            &[
                ("x", &fmt_px(bbox.x)),
                ("y", &fmt_px(bbox.y)),
                ("width", &fmt_px(bbox.width)),
                ("height", &fmt_px(bbox.height)),
                ("fill", "none"),
                ("stroke", &color),
                ("stroke-width", &line_width),
            ],
        )?;

        if options.show_labels {
            let label = overlay_label(element.label(), element.category());
            // Labels sit above the box unless that would leave the image.
            let baseline = if bbox.y >= LABEL_OFFSET {
                bbox.y - 4.0
            } else {
                bbox.y + options.font_size as f64
            };
            xml.text_element(
                "text",
                &[
                    ("x", &fmt_px(bbox.x)),
                    ("y", &fmt_px(baseline)),
                    ("fill", &color),
                    ("font-size", &font_size),
                    ("font-family", "sans-serif"),
                ],
                &label,
            )?;
        }
        xml.end("g")?;
    }

    xml.end("svg")?;
    xml.into_string()
}

/// Label text truncated to 30 characters, with a category fallback.
pub fn overlay_label(label: &str, category: Category) -> String {
    let label = label.trim();
    if label.is_empty() {
        match category {
            Category::Text => String::new(),
            Category::Icon => "Icon".to_string(),
            Category::Chart => "Chart".to_string(),
        }
    } else {
        label.chars().take(LABEL_CHARS).collect()
    }
}

fn fmt_px(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
