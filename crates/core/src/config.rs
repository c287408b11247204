//! Tunable thresholds for element normalization.
//!
//! The defaults were tuned empirically on generated slide decks; they are
//! exposed here so they can be adjusted per dataset.

use crate::error::{Error, Result};
use crate::types::Category;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Overflow (in pixels) a box may have past any image edge and still be
/// considered in-bounds.
pub const DEFAULT_TOLERANCE_PX: f64 = 10.0;

/// Overlap above which the smaller of two boxes is treated as a duplicate.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.7;

/// Per-category filtering rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Minimum box area (px²) for an element to be kept.
    pub min_area: f64,

    /// Boxes overlapping a kept box by more than this IoU are dropped.
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f64,
}

impl CategoryRule {
    pub fn new(min_area: f64) -> Self {
        Self {
            min_area,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

fn default_iou_threshold() -> f64 {
    DEFAULT_IOU_THRESHOLD
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_PX
}

fn default_text_rule() -> CategoryRule {
    CategoryRule::new(100.0)
}

fn default_icon_rule() -> CategoryRule {
    CategoryRule::new(200.0)
}

fn default_chart_rule() -> CategoryRule {
    CategoryRule::new(500.0)
}

/// Configuration table driving the normalization pipeline.
///
/// Every field has a default, so a JSON file only needs the values it
/// overrides, e.g. `{"icon": {"min_area": 400}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "default_text_rule")]
    pub text: CategoryRule,

    #[serde(default = "default_icon_rule")]
    pub icon: CategoryRule,

    #[serde(default = "default_chart_rule")]
    pub chart: CategoryRule,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE_PX,
            text: default_text_rule(),
            icon: default_icon_rule(),
            chart: default_chart_rule(),
        }
    }
}

impl NormalizerConfig {
    /// Create a configuration with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::Configuration(format!("Invalid threshold file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Set the in-bounds tolerance in pixels.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    /// Set the minimum area for one category.
    pub fn with_min_area(mut self, category: Category, min_area: f64) -> Self {
        self.rule_mut(category).min_area = min_area.max(0.0);
        self
    }

    /// Set the duplicate IoU threshold for one category.
    pub fn with_iou_threshold(mut self, category: Category, threshold: f64) -> Self {
        self.rule_mut(category).iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// The rule for one category.
    pub fn rule(&self, category: Category) -> &CategoryRule {
        match category {
            Category::Text => &self.text,
            Category::Icon => &self.icon,
            Category::Chart => &self.chart,
        }
    }

    fn rule_mut(&mut self, category: Category) -> &mut CategoryRule {
        match category {
            Category::Text => &mut self.text,
            Category::Icon => &mut self.icon,
            Category::Chart => &mut self.chart,
        }
    }

    /// Reject values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::Configuration(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }

        for category in Category::ALL {
            let rule = self.rule(category);
            if !rule.min_area.is_finite() || rule.min_area < 0.0 {
                return Err(Error::Configuration(format!(
                    "{} min_area must be a non-negative number, got {}",
                    category, rule.min_area
                )));
            }
            if !(0.0..=1.0).contains(&rule.iou_threshold) {
                return Err(Error::Configuration(format!(
                    "{} iou_threshold must be within [0, 1], got {}",
                    category, rule.iou_threshold
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NormalizerConfig::new();
        assert_eq!(config.tolerance, 10.0);
        assert_eq!(config.rule(Category::Text).min_area, 100.0);
        assert_eq!(config.rule(Category::Icon).min_area, 200.0);
        assert_eq!(config.rule(Category::Chart).min_area, 500.0);
        for category in Category::ALL {
            assert_eq!(config.rule(category).iou_threshold, 0.7);
        }
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = NormalizerConfig::from_json(r#"{"icon": {"min_area": 400}}"#).unwrap();
        assert_eq!(config.icon.min_area, 400.0);
        assert_eq!(config.icon.iou_threshold, 0.7);
        assert_eq!(config.text, NormalizerConfig::default().text);
        assert_eq!(config.tolerance, 10.0);
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        assert!(matches!(
            NormalizerConfig::from_json(r#"{"chart": {"min_area": 10, "iou_threshold": 1.5}}"#),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            NormalizerConfig::from_json("not json"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = NormalizerConfig::new()
            .with_tolerance(4.0)
            .with_min_area(Category::Text, 64.0)
            .with_iou_threshold(Category::Chart, 0.5);
        assert_eq!(config.tolerance, 4.0);
        assert_eq!(config.text.min_area, 64.0);
        assert_eq!(config.chart.iou_threshold, 0.5);
        assert!(config.validate().is_ok());
    }
}
