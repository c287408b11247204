//! WASM-compatible wrapper for slide element normalization.
//!
//! This crate exposes response parsing, normalization and canvas placement
//! to JavaScript for use in Cloudflare Workers. The vision call itself and
//! the PPTX assembly stay on the caller's side.

use deck_core::mapping::Canvas;
use deck_core::{
    parse_response, CoordinateMapper, ElementNormalizer, ElementSet, ImageSize, MappedElement,
    NormalizationReport, SegmentationStats,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Result of normalizing one vision response.
#[derive(Debug, Serialize)]
pub struct NormalizeResult {
    /// Clean elements in the response's JSON shape.
    pub elements: ElementSet,
    /// Per-category drop counters.
    pub report: NormalizationReport,
    pub stats: SegmentationStats,
}

/// Parse and normalize a raw vision response for an image of the given size.
///
/// # Returns
/// A JavaScript object `{ elements, report, stats }`, or throws a string on
/// unparseable responses and empty images.
#[wasm_bindgen]
pub fn normalize_response(text: &str, width: u32, height: u32) -> Result<JsValue, JsValue> {
    let result = normalize_response_impl(text, width, height).map_err(|e| JsValue::from_str(&e))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn normalize_response_impl(text: &str, width: u32, height: u32) -> Result<NormalizeResult, String> {
    let raw = parse_response(text).map_err(|e| e.to_string())?;
    let (elements, report) = ElementNormalizer::new()
        .normalize_with_report(&raw, ImageSize::new(width, height))
        .map_err(|e| e.to_string())?;
    let stats = SegmentationStats::from(&elements);

    Ok(NormalizeResult {
        elements,
        report,
        stats,
    })
}

/// Place normalized elements on the standard 16:9 canvas.
///
/// # Arguments
/// * `elements` - An element set as returned by `normalize_response`
/// * `width`, `height` - Pixel size of the source image
///
/// # Returns
/// An array of placements in EMU, text first, then icons, then charts.
#[wasm_bindgen]
pub fn place_elements(elements: JsValue, width: u32, height: u32) -> Result<JsValue, JsValue> {
    let elements: ElementSet = serde_wasm_bindgen::from_value(elements)
        .map_err(|e| JsValue::from_str(&format!("Invalid element set: {}", e)))?;

    let placed = place_elements_impl(&elements, width, height).map_err(|e| JsValue::from_str(&e))?;

    serde_wasm_bindgen::to_value(&placed)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn place_elements_impl(
    elements: &ElementSet,
    width: u32,
    height: u32,
) -> Result<Vec<MappedElement>, String> {
    let mapper = CoordinateMapper::new(Canvas::widescreen_emu(), ImageSize::new(width, height))
        .map_err(|e| e.to_string())?;
    Ok(mapper.map_elements(elements))
}
