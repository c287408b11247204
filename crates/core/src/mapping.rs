//! Projection of pixel-space geometry onto a fixed-size document canvas.
//!
//! Each axis is scaled independently, so a source image whose aspect ratio
//! differs from the canvas is stretched. Font sizes follow the vertical
//! scale only, keeping text proportionate to slide height.

use crate::error::{Error, Result};
use crate::types::{BoundingBox, Category, ElementRef, ElementSet, ImageSize, TextElement};
use serde::{Deserialize, Serialize};

/// English Metric Units per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;

/// English Metric Units per typographic point.
pub const EMU_PER_POINT: f64 = 12_700.0;

/// Typographic points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Size of the output page, in the document's native length unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,

    /// Typographic points per length unit.
    pub points_per_unit: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64, points_per_unit: f64) -> Self {
        Self {
            width,
            height,
            points_per_unit,
        }
    }

    /// 10 in x 5.625 in widescreen page measured in inches.
    pub fn widescreen_inches() -> Self {
        Self::new(10.0, 5.625, POINTS_PER_INCH)
    }

    /// 10 in x 5.625 in widescreen page measured in EMU.
    pub fn widescreen_emu() -> Self {
        Self::new(10.0 * EMU_PER_INCH, 5.625 * EMU_PER_INCH, 1.0 / EMU_PER_POINT)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::widescreen_emu()
    }
}

/// Position and size of a shape on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// An element projected onto the canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedElement {
    pub category: Category,
    pub placement: Placement,

    /// Point size, for text elements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size_pt: Option<u32>,

    pub bold: bool,
    pub label: String,
}

/// Converts pixel boxes and pixel font sizes into canvas units and points.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    canvas: Canvas,
    image: ImageSize,
    scale_x: f64,
    scale_y: f64,
    min_extent: f64,
}

impl CoordinateMapper {
    /// Create a mapper for one source image.
    ///
    /// Fails when the image has no pixels or the canvas has no area.
    pub fn new(canvas: Canvas, image: ImageSize) -> Result<Self> {
        if image.is_empty() {
            return Err(Error::InvalidInput(format!(
                "cannot map elements from an empty image ({})",
                image
            )));
        }
        if !(canvas.width > 0.0 && canvas.height > 0.0 && canvas.points_per_unit > 0.0) {
            return Err(Error::InvalidInput(format!(
                "canvas must have positive dimensions, got {} x {} ({} pt/unit)",
                canvas.width, canvas.height, canvas.points_per_unit
            )));
        }

        Ok(Self {
            canvas,
            image,
            scale_x: canvas.width / image.width as f64,
            scale_y: canvas.height / image.height as f64,
            min_extent: 1.0,
        })
    }

    /// Set the size given to shapes whose scaled extent would be zero.
    pub fn with_min_extent(mut self, min_extent: f64) -> Self {
        if min_extent > 0.0 {
            self.min_extent = min_extent;
        }
        self
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn image(&self) -> ImageSize {
        self.image
    }

    /// Canvas units per source pixel, horizontally.
    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    /// Canvas units per source pixel, vertically.
    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    /// Project a pixel box onto the canvas.
    pub fn map_bbox(&self, bbox: &BoundingBox) -> Placement {
        Placement {
            left: bbox.x * self.scale_x,
            top: bbox.y * self.scale_y,
            width: self.visible(bbox.width * self.scale_x),
            height: self.visible(bbox.height * self.scale_y),
        }
    }

    /// Convert a pixel font size to whole points, never below 1.
    pub fn map_font_size(&self, font_size_px: f64) -> u32 {
        let points = font_size_px * self.scale_y * self.canvas.points_per_unit;
        if points.is_finite() && points >= 1.0 {
            points.round() as u32
        } else {
            1
        }
    }

    /// Project a text element, returning its placement and point size.
    pub fn map_text(&self, element: &TextElement) -> (Placement, u32) {
        (
            self.map_bbox(&element.bbox),
            self.map_font_size(element.font_size),
        )
    }

    /// Project every element of a set, text first, then icons, then charts.
    pub fn map_elements(&self, elements: &ElementSet) -> Vec<MappedElement> {
        elements
            .iter()
            .map(|element| {
                let (font_size_pt, bold) = match element {
                    ElementRef::Text(text) => (
                        Some(self.map_font_size(text.font_size)),
                        text.font_weight.is_bold(),
                    ),
                    _ => (None, false),
                };
                MappedElement {
                    category: element.category(),
                    placement: self.map_bbox(element.bbox()),
                    font_size_pt,
                    bold,
                    label: element.label().to_string(),
                }
            })
            .collect()
    }

    fn visible(&self, extent: f64) -> f64 {
        if extent > 0.0 {
            extent
        } else {
            self.min_extent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FontWeight;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn inches_mapper() -> CoordinateMapper {
        CoordinateMapper::new(Canvas::widescreen_inches(), ImageSize::new(1000, 600)).unwrap()
    }

    #[test]
    fn test_scale_factors() {
        let mapper = inches_mapper();
        assert!(approx(mapper.scale_x(), 0.01));
        assert!(approx(mapper.scale_y(), 0.009375));
    }

    #[test]
    fn test_map_bbox() {
        let placement = inches_mapper().map_bbox(&BoundingBox::new(100.0, 100.0, 200.0, 100.0));
        assert!(approx(placement.left, 1.0));
        assert!(approx(placement.top, 0.9375));
        assert!(approx(placement.width, 2.0));
        assert!(approx(placement.height, 0.9375));
    }

    #[test]
    fn test_font_size_follows_vertical_scale() {
        let mapper = inches_mapper();
        // 24 * (5.625 / 600) * 72 = 16.2
        assert_eq!(mapper.map_font_size(24.0), 16);

        // Same image height, wider image: horizontal stretch does not matter.
        let wide =
            CoordinateMapper::new(Canvas::widescreen_inches(), ImageSize::new(3000, 600)).unwrap();
        assert_eq!(wide.map_font_size(24.0), 16);
    }

    #[test]
    fn test_font_size_in_emu_matches_inches() {
        let emu =
            CoordinateMapper::new(Canvas::widescreen_emu(), ImageSize::new(1000, 600)).unwrap();
        assert_eq!(emu.map_font_size(24.0), 16);
        assert_eq!(emu.map_font_size(40.0), 27);
    }

    #[test]
    fn test_font_size_never_below_one_point() {
        let mapper = inches_mapper();
        assert_eq!(mapper.map_font_size(0.0), 1);
        assert_eq!(mapper.map_font_size(-12.0), 1);
        assert_eq!(mapper.map_font_size(f64::NAN), 1);
    }

    #[test]
    fn test_zero_extent_gets_minimum_size() {
        let mapper = inches_mapper();
        let placement = mapper.map_bbox(&BoundingBox::new(10.0, 10.0, 0.0, -4.0));
        assert_eq!(placement.width, 1.0);
        assert_eq!(placement.height, 1.0);

        let placement = mapper
            .with_min_extent(0.05)
            .map_bbox(&BoundingBox::new(10.0, 10.0, 0.0, 5.0));
        assert_eq!(placement.width, 0.05);
        assert!(approx(placement.height, 0.046875));
    }

    #[test]
    fn test_rejects_degenerate_inputs() {
        assert!(CoordinateMapper::new(Canvas::widescreen_emu(), ImageSize::new(0, 10)).is_err());
        assert!(
            CoordinateMapper::new(Canvas::new(0.0, 5.0, 72.0), ImageSize::new(10, 10)).is_err()
        );
    }

    #[test]
    fn test_map_elements() {
        let mut set = ElementSet::new();
        set.text_elements.push(TextElement {
            text: "Quarterly results".into(),
            bbox: BoundingBox::new(100.0, 100.0, 200.0, 100.0),
            font_size: 24.0,
            font_weight: FontWeight::Bold,
        });
        set.icons.push(crate::types::IconElement {
            kind: "icon".into(),
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 60.0),
            description: "logo".into(),
        });

        let mapped = inches_mapper().map_elements(&set);
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].category, Category::Text);
        assert_eq!(mapped[0].font_size_pt, Some(16));
        assert!(mapped[0].bold);
        assert_eq!(mapped[1].category, Category::Icon);
        assert_eq!(mapped[1].font_size_pt, None);
        assert!(approx(mapped[1].placement.width, 1.0));
        assert!(approx(mapped[1].placement.height, 0.5625));
    }
}
