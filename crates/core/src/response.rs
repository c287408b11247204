//! Recovery of the element JSON object from a vision service response.
//!
//! The service is asked for bare JSON but sometimes wraps it in code fences
//! or surrounds it with prose. Parsing tries the cleaned text as-is first,
//! then the outermost `{...}` span, and gives up with a [`Error::Parse`]
//! carrying a short preview of what was received.

use crate::error::{Error, Result};
use crate::types::Category;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// A fence line: three backticks, optionally followed by a language tag.
static FENCE_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+.-]*\s*$").unwrap());

/// First `{` through last `}`, across newlines.
static OBJECT_SPAN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Raw, unvalidated element records for one image.
///
/// Missing keys default to empty lists; individual records are kept as raw
/// JSON so the normalizer can drop malformed ones without failing the image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawElements {
    pub text_elements: Vec<Value>,
    pub icons: Vec<Value>,
    pub charts: Vec<Value>,
    pub background_info: Option<Value>,
}

impl RawElements {
    /// Split a top-level JSON value into per-category record lists.
    ///
    /// Fails only when `value` is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(Error::InvalidInput(format!(
                "expected a JSON object at the top level, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn from_map(mut map: Map<String, Value>) -> Self {
        let mut take_list = |category: Category| -> Vec<Value> {
            match map.remove(category.response_key()) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    log::warn!(
                        "Ignoring '{}': expected a list, got {}",
                        category.response_key(),
                        json_kind(&other)
                    );
                    Vec::new()
                }
            }
        };

        let text_elements = take_list(Category::Text);
        let icons = take_list(Category::Icon);
        let charts = take_list(Category::Chart);

        let background_info = match map.remove("background_info") {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        };

        Self {
            text_elements,
            icons,
            charts,
            background_info,
        }
    }

    /// The raw records for one category.
    pub fn records(&self, category: Category) -> &[Value] {
        match category {
            Category::Text => &self.text_elements,
            Category::Icon => &self.icons,
            Category::Chart => &self.charts,
        }
    }

    /// Total number of raw records across all categories.
    pub fn len(&self) -> usize {
        self.text_elements.len() + self.icons.len() + self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a raw service response into element records.
pub fn parse_response(response_text: &str) -> Result<RawElements> {
    let object = extract_json_object(response_text)?;
    let raw = RawElements::from_map(object);

    log::debug!(
        "Parsed elements: {} text, {} icons, {} charts",
        raw.text_elements.len(),
        raw.icons.len(),
        raw.charts.len()
    );

    Ok(raw)
}

/// Recover the JSON object embedded in a response.
pub fn extract_json_object(response_text: &str) -> Result<Map<String, Value>> {
    let cleaned = strip_code_fences(response_text);

    if cleaned.is_empty() {
        return Err(Error::parse(&cleaned));
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(map);
    }

    if let Some(span) = OBJECT_SPAN_REGEX.find(&cleaned) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(span.as_str()) {
            log::debug!("Recovered JSON object embedded in surrounding text");
            return Ok(map);
        }
    }

    log::error!(
        "Failed to parse JSON. Response preview: {}",
        cleaned.chars().take(crate::error::PREVIEW_CHARS).collect::<String>()
    );
    Err(Error::parse(&cleaned))
}

/// Remove code-fence marker lines and surrounding whitespace.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .lines()
        .filter(|line| !FENCE_LINE_REGEX.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
