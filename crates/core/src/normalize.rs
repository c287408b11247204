//! Element normalization: validate, clamp, filter and deduplicate.
//!
//! The same pipeline runs for every category; only the thresholds in
//! [`NormalizerConfig`] differ. Bad records are dropped and logged, never
//! raised, because partial detection noise must not cost the whole slide.

use crate::config::NormalizerConfig;
use crate::error::{Error, Result};
use crate::response::RawElements;
use crate::types::{
    BackgroundInfo, BoundingBox, Category, ChartElement, ElementSet, FontWeight, IconElement,
    ImageSize, TextElement, DEFAULT_FONT_SIZE_PX,
};
use serde::Serialize;
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

/// Characters of an element's label shown in log lines.
const LOG_LABEL_CHARS: usize = 30;

/// An element type the normalizer can build from a raw record.
pub trait Detection: Sized {
    const CATEGORY: Category;

    /// Build the element from its record and an already-validated box.
    fn from_record(record: &Map<String, Value>, bbox: BoundingBox) -> Self;

    fn bbox(&self) -> &BoundingBox;

    fn bbox_mut(&mut self) -> &mut BoundingBox;

    /// Short human-readable label used in logs.
    fn label(&self) -> &str;
}

impl Detection for TextElement {
    const CATEGORY: Category = Category::Text;

    fn from_record(record: &Map<String, Value>, bbox: BoundingBox) -> Self {
        let text = record
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .nfc()
            .collect::<String>();

        let font_size = record
            .get("font_size")
            .and_then(as_number)
            .filter(|size| *size > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE_PX);

        let font_weight = record
            .get("font_weight")
            .and_then(Value::as_str)
            .map(FontWeight::from_label)
            .unwrap_or_default();

        TextElement {
            text,
            bbox,
            font_size,
            font_weight,
        }
    }

    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn bbox_mut(&mut self) -> &mut BoundingBox {
        &mut self.bbox
    }

    fn label(&self) -> &str {
        &self.text
    }
}

impl Detection for IconElement {
    const CATEGORY: Category = Category::Icon;

    fn from_record(record: &Map<String, Value>, bbox: BoundingBox) -> Self {
        IconElement {
            kind: kind_tag(record, Self::CATEGORY),
            bbox,
            description: description(record),
        }
    }

    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn bbox_mut(&mut self) -> &mut BoundingBox {
        &mut self.bbox
    }

    fn label(&self) -> &str {
        &self.description
    }
}

impl Detection for ChartElement {
    const CATEGORY: Category = Category::Chart;

    fn from_record(record: &Map<String, Value>, bbox: BoundingBox) -> Self {
        ChartElement {
            kind: kind_tag(record, Self::CATEGORY),
            bbox,
            description: description(record),
        }
    }

    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn bbox_mut(&mut self) -> &mut BoundingBox {
        &mut self.bbox
    }

    fn label(&self) -> &str {
        &self.description
    }
}

fn kind_tag(record: &Map<String, Value>, category: Category) -> String {
    record
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(category.as_str())
        .to_string()
}

fn description(record: &Map<String, Value>) -> String {
    record
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Read a finite number, accepting numeric strings as the service
/// occasionally quotes its numbers.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Parse a `[x, y, width, height]` array of exactly four numbers.
pub fn parse_bbox(value: Option<&Value>) -> Option<BoundingBox> {
    let items = value?.as_array()?;
    if items.len() != 4 {
        return None;
    }
    let x = as_number(&items[0])?;
    let y = as_number(&items[1])?;
    let width = as_number(&items[2])?;
    let height = as_number(&items[3])?;
    Some(BoundingBox::new(x, y, width, height))
}

fn truncate_label(label: &str) -> String {
    let label = if label.is_empty() { "unknown" } else { label };
    label.chars().take(LOG_LABEL_CHARS).collect()
}

/// Drop counters for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    /// Raw records received from the service.
    pub received: usize,
    /// Records with a missing, malformed or out-of-bounds box.
    pub invalid: usize,
    /// Records below the category's minimum area.
    pub too_small: usize,
    /// Records overlapping a larger kept element.
    pub duplicates: usize,
    /// Elements that survived normalization.
    pub kept: usize,
}

impl CategoryReport {
    pub fn dropped(&self) -> usize {
        self.invalid + self.too_small + self.duplicates
    }
}

/// What the normalizer did to one image's detections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub text: CategoryReport,
    pub icon: CategoryReport,
    pub chart: CategoryReport,
}

impl NormalizationReport {
    pub fn category(&self, category: Category) -> &CategoryReport {
        match category {
            Category::Text => &self.text,
            Category::Icon => &self.icon,
            Category::Chart => &self.chart,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut CategoryReport {
        match category {
            Category::Text => &mut self.text,
            Category::Icon => &mut self.icon,
            Category::Chart => &mut self.chart,
        }
    }

    /// Total records dropped across all categories.
    pub fn dropped(&self) -> usize {
        Category::ALL
            .iter()
            .map(|c| self.category(*c).dropped())
            .sum()
    }
}

/// Turns raw service records into an [`ElementSet`] safe to place on a canvas.
#[derive(Debug, Clone, Default)]
pub struct ElementNormalizer {
    config: NormalizerConfig,
}

impl ElementNormalizer {
    /// Create a normalizer with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom thresholds.
    pub fn with_config(mut self, config: NormalizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a parsed top-level JSON value.
    ///
    /// Fails when `value` is not an object or the image has no pixels.
    pub fn normalize_value(&self, value: Value, image: ImageSize) -> Result<ElementSet> {
        let raw = RawElements::from_value(value)?;
        self.normalize(&raw, image)
    }

    /// Normalize raw records for an image of the given size.
    pub fn normalize(&self, raw: &RawElements, image: ImageSize) -> Result<ElementSet> {
        self.normalize_with_report(raw, image).map(|(set, _)| set)
    }

    /// Normalize raw records and report what was dropped.
    pub fn normalize_with_report(
        &self,
        raw: &RawElements,
        image: ImageSize,
    ) -> Result<(ElementSet, NormalizationReport)> {
        if image.is_empty() {
            return Err(Error::InvalidInput(format!(
                "cannot normalize elements for an empty image ({})",
                image
            )));
        }

        let mut report = NormalizationReport::default();
        let set = ElementSet {
            text_elements: self.normalize_category(raw, image, &mut report),
            icons: self.normalize_category(raw, image, &mut report),
            charts: self.normalize_category(raw, image, &mut report),
            background_info: raw.background_info.as_ref().and_then(parse_background_info),
        };

        log::info!(
            "Validated elements: {} text, {} icons, {} charts ({} dropped)",
            set.text_elements.len(),
            set.icons.len(),
            set.charts.len(),
            report.dropped()
        );

        Ok((set, report))
    }

    /// Run validate → clamp → area filter → deduplicate for one category.
    fn normalize_category<E: Detection>(
        &self,
        raw: &RawElements,
        image: ImageSize,
        report: &mut NormalizationReport,
    ) -> Vec<E> {
        let category = E::CATEGORY;
        let rule = *self.config.rule(category);
        let counts = report.category_mut(category);
        let records = raw.records(category);
        counts.received = records.len();

        let width = image.width as f64;
        let height = image.height as f64;

        let mut survivors: Vec<(usize, E)> = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let Some(fields) = record.as_object() else {
                log::warn!("Invalid {} element: expected an object, got {}", category, record);
                counts.invalid += 1;
                continue;
            };

            let bbox = match parse_bbox(fields.get("bbox")) {
                Some(bbox)
                    if bbox.width > 0.0
                        && bbox.height > 0.0
                        && bbox.is_in_bounds(width, height, self.config.tolerance) =>
                {
                    bbox
                }
                _ => {
                    log::warn!(
                        "Invalid {} element bbox: {}, image size: {}",
                        category,
                        fields.get("bbox").unwrap_or(&Value::Null),
                        image
                    );
                    counts.invalid += 1;
                    continue;
                }
            };

            let mut element = E::from_record(fields, bbox);
            let clamped = element.bbox().clamped(width, height);
            *element.bbox_mut() = clamped;

            let area = clamped.area();
            if area < rule.min_area {
                log::debug!(
                    "Filtered out small {} element: {}, area: {:.1} < {}",
                    category,
                    truncate_label(element.label()),
                    area,
                    rule.min_area
                );
                counts.too_small += 1;
                continue;
            }

            survivors.push((index, element));
        }

        let before = survivors.len();
        let kept = deduplicate(survivors, rule.iou_threshold);
        counts.duplicates = before - kept.len();
        counts.kept = kept.len();
        kept
    }
}

/// Greedy overlap suppression, largest boxes first.
///
/// An element is discarded when its IoU with an already-accepted element
/// exceeds `iou_threshold`. Survivors are returned in detector order.
fn deduplicate<E: Detection>(mut elements: Vec<(usize, E)>, iou_threshold: f64) -> Vec<E> {
    if elements.len() <= 1 {
        return elements.into_iter().map(|(_, e)| e).collect();
    }

    // Stable: equal areas keep detector order.
    elements.sort_by(|(_, a), (_, b)| {
        b.bbox()
            .area()
            .partial_cmp(&a.bbox().area())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut accepted: Vec<(usize, E)> = Vec::with_capacity(elements.len());
    for (index, element) in elements {
        let overlap = accepted
            .iter()
            .map(|(_, kept)| kept.bbox().iou(element.bbox()))
            .find(|iou| *iou > iou_threshold);

        if let Some(iou) = overlap {
            log::debug!(
                "Removed duplicate {} element (overlap: {:.0}%): {}",
                E::CATEGORY,
                iou * 100.0,
                truncate_label(element.label())
            );
            continue;
        }
        accepted.push((index, element));
    }

    accepted.sort_by_key(|(index, _)| *index);
    accepted.into_iter().map(|(_, e)| e).collect()
}

fn parse_background_info(value: &Value) -> Option<BackgroundInfo> {
    match serde_json::from_value::<BackgroundInfo>(value.clone()) {
        Ok(info) => Some(info),
        Err(e) => {
            log::warn!("Ignoring malformed background_info {}: {}", value, e);
            None
        }
    }
}
