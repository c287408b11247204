//! Domain types for elements recovered from a slide image.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Font size assumed when the service does not estimate one (pixels).
pub const DEFAULT_FONT_SIZE_PX: f64 = 18.0;

/// Pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned rectangle in source-image pixels, origin top-left.
///
/// Serialized as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether the box lies inside a `width` x `height` image, allowing
    /// `tolerance` pixels of overflow on every side.
    pub fn is_in_bounds(&self, image_width: f64, image_height: f64, tolerance: f64) -> bool {
        self.x >= -tolerance
            && self.y >= -tolerance
            && self.right() <= image_width + tolerance
            && self.bottom() <= image_height + tolerance
    }

    /// Clamp the box into `[0, W) x [0, H)`.
    ///
    /// The result keeps its origin inside the image, never extends past the
    /// right or bottom edge, and is at least one pixel in each dimension.
    /// Clamping is idempotent.
    pub fn clamped(&self, image_width: f64, image_height: f64) -> Self {
        let x = self.x.min(image_width - 1.0).max(0.0);
        let y = self.y.min(image_height - 1.0).max(0.0);
        let width = self.width.min(image_width - x).max(1.0);
        let height = self.height.min(image_height - y).max(1.0);
        Self::new(x, y, width, height)
    }

    /// Area of the intersection of two boxes (zero when disjoint).
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let x_overlap = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let y_overlap = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        x_overlap * y_overlap
    }

    /// Intersection over union, in `[0, 1]`. A zero union yields 0.
    pub fn iou(&self, other: &Self) -> f64 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.1}, {:.1}, {:.1}, {:.1}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// The kind of content a detection represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Text,
    Icon,
    Chart,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Text, Category::Icon, Category::Chart];

    /// Key of this category's list in the service response.
    pub fn response_key(&self) -> &'static str {
        match self {
            Category::Text => "text_elements",
            Category::Icon => "icons",
            Category::Chart => "charts",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Icon => "icon",
            Category::Chart => "chart",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated stroke weight of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Bold,
    #[default]
    Normal,
}

impl FontWeight {
    /// Anything other than "bold" (case-insensitive) is normal weight.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("bold") {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, FontWeight::Bold)
    }
}

/// A run of text detected on the slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    /// Recognized text. May be empty; empty text is skipped when placing.
    #[serde(default)]
    pub text: String,

    pub bbox: BoundingBox,

    /// Estimated font size in source-image pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    #[serde(default)]
    pub font_weight: FontWeight,
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE_PX
}

/// A pictogram or embedded picture detected on the slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconElement {
    /// Category tag reported by the service.
    #[serde(rename = "type", default = "default_icon_kind")]
    pub kind: String,

    pub bbox: BoundingBox,

    #[serde(default)]
    pub description: String,
}

fn default_icon_kind() -> String {
    Category::Icon.as_str().to_string()
}

/// A chart, diagram or other graphic detected on the slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartElement {
    /// Category tag reported by the service.
    #[serde(rename = "type", default = "default_chart_kind")]
    pub kind: String,

    pub bbox: BoundingBox,

    #[serde(default)]
    pub description: String,
}

fn default_chart_kind() -> String {
    Category::Chart.as_str().to_string()
}

/// Read-only summary of the slide background.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackgroundInfo {
    #[serde(default)]
    pub has_gradient: bool,

    /// Human-readable name of the dominant color.
    #[serde(default)]
    pub main_color: String,

    #[serde(default)]
    pub has_texture: bool,
}

/// Borrowed view over one element of any category.
#[derive(Debug, Clone, Copy)]
pub enum ElementRef<'a> {
    Text(&'a TextElement),
    Icon(&'a IconElement),
    Chart(&'a ChartElement),
}

impl<'a> ElementRef<'a> {
    pub fn category(&self) -> Category {
        match self {
            ElementRef::Text(_) => Category::Text,
            ElementRef::Icon(_) => Category::Icon,
            ElementRef::Chart(_) => Category::Chart,
        }
    }

    pub fn bbox(&self) -> &'a BoundingBox {
        match self {
            ElementRef::Text(e) => &e.bbox,
            ElementRef::Icon(e) => &e.bbox,
            ElementRef::Chart(e) => &e.bbox,
        }
    }

    /// Text for text elements, description for everything else.
    pub fn label(&self) -> &'a str {
        match self {
            ElementRef::Text(e) => &e.text,
            ElementRef::Icon(e) => &e.description,
            ElementRef::Chart(e) => &e.description,
        }
    }
}

/// Clean, per-category element lists for one slide image.
///
/// Order within a list is detector order after deduplication, not spatial
/// order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementSet {
    #[serde(default)]
    pub text_elements: Vec<TextElement>,

    #[serde(default)]
    pub icons: Vec<IconElement>,

    #[serde(default)]
    pub charts: Vec<ChartElement>,

    #[serde(default)]
    pub background_info: Option<BackgroundInfo>,
}

impl ElementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of elements across all categories.
    pub fn len(&self) -> usize {
        self.text_elements.len() + self.icons.len() + self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every element: text first, then icons, then charts.
    pub fn iter(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.text_elements
            .iter()
            .map(ElementRef::Text)
            .chain(self.icons.iter().map(ElementRef::Icon))
            .chain(self.charts.iter().map(ElementRef::Chart))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_serializes_as_array() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(serde_json::to_string(&bbox).unwrap(), "[1.0,2.0,3.0,4.0]");

        let back: BoundingBox = serde_json::from_str("[5, 6, 7, 8]").unwrap();
        assert_eq!(back, BoundingBox::new(5.0, 6.0, 7.0, 8.0));
    }

    #[test]
    fn test_in_bounds_tolerance() {
        let inside = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        assert!(inside.is_in_bounds(100.0, 50.0, 10.0));

        let slight_overflow = BoundingBox::new(-10.0, -5.0, 120.0, 60.0);
        assert!(slight_overflow.is_in_bounds(100.0, 50.0, 10.0));

        let too_far_right = BoundingBox::new(0.0, 0.0, 111.0, 10.0);
        assert!(!too_far_right.is_in_bounds(100.0, 50.0, 10.0));

        let too_far_up = BoundingBox::new(0.0, -10.5, 10.0, 10.0);
        assert!(!too_far_up.is_in_bounds(100.0, 50.0, 10.0));
    }

    #[test]
    fn test_clamp_inside_is_noop() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(bbox.clamped(100.0, 100.0), bbox);
    }

    #[test]
    fn test_clamp_pulls_overflow_back() {
        let bbox = BoundingBox::new(-5.0, 95.0, 110.0, 12.0);
        let clamped = bbox.clamped(100.0, 100.0);
        assert_eq!(clamped, BoundingBox::new(0.0, 95.0, 100.0, 5.0));
        assert!(clamped.right() <= 100.0);
        assert!(clamped.bottom() <= 100.0);
    }

    #[test]
    fn test_clamp_keeps_minimum_size() {
        let bbox = BoundingBox::new(105.0, 105.0, 3.0, 3.0);
        let clamped = bbox.clamped(100.0, 100.0);
        assert_eq!(clamped, BoundingBox::new(99.0, 99.0, 1.0, 1.0));
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let samples = [
            BoundingBox::new(-8.0, -3.0, 50.0, 50.0),
            BoundingBox::new(90.0, 90.0, 20.0, 20.0),
            BoundingBox::new(0.0, 0.0, 0.5, 0.5),
            BoundingBox::new(12.5, 7.25, 33.3, 41.9),
        ];
        for bbox in samples {
            let once = bbox.clamped(100.0, 80.0);
            assert_eq!(once.clamped(100.0, 80.0), once);
        }
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 25.0 / 175.0);
        assert_eq!(a.iou(&a), 1.0);

        let disjoint = BoundingBox::new(20.0, 20.0, 5.0, 5.0);
        assert_eq!(a.iou(&disjoint), 0.0);

        let empty = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(empty.iou(&empty), 0.0);
    }

    #[test]
    fn test_font_weight_from_label() {
        assert_eq!(FontWeight::from_label("bold"), FontWeight::Bold);
        assert_eq!(FontWeight::from_label(" Bold "), FontWeight::Bold);
        assert_eq!(FontWeight::from_label("normal"), FontWeight::Normal);
        assert_eq!(FontWeight::from_label("heavy"), FontWeight::Normal);
    }

    #[test]
    fn test_element_set_json_shape() {
        let mut set = ElementSet::new();
        set.icons.push(IconElement {
            kind: "icon".into(),
            bbox: BoundingBox::new(1.0, 2.0, 30.0, 40.0),
            description: "rocket".into(),
        });

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["icons"][0]["type"], "icon");
        assert_eq!(value["icons"][0]["bbox"][2], 30.0);
        assert!(value["text_elements"].as_array().unwrap().is_empty());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_iter_orders_categories() {
        let mut set = ElementSet::new();
        set.charts.push(ChartElement {
            kind: "chart".into(),
            bbox: BoundingBox::new(0.0, 0.0, 50.0, 50.0),
            description: "bar chart".into(),
        });
        set.text_elements.push(TextElement {
            text: "Title".into(),
            bbox: BoundingBox::new(0.0, 0.0, 50.0, 10.0),
            font_size: 24.0,
            font_weight: FontWeight::Bold,
        });

        let categories: Vec<Category> = set.iter().map(|e| e.category()).collect();
        assert_eq!(categories, vec![Category::Text, Category::Chart]);
        assert_eq!(set.iter().next().unwrap().label(), "Title");
    }
}
