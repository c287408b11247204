//! Heuristic background analysis.
//!
//! The label only picks which prompt goes to the vision service; it never
//! influences normalization. Classification is a swappable strategy behind
//! [`BackgroundClassifier`].

use crate::types::BackgroundInfo;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse background complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundLabel {
    /// Solid color or nearly so.
    Simple,
    /// Smooth color change across the slide.
    Gradient,
    /// Strong high-frequency variation (patterns, photos).
    Textured,
    /// Anything else, and the answer when analysis is impossible.
    Complex,
}

impl BackgroundLabel {
    /// Whether decorative background detail is likely to be misread as content.
    pub fn is_busy(&self) -> bool {
        matches!(self, BackgroundLabel::Textured | BackgroundLabel::Complex)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundLabel::Simple => "simple",
            BackgroundLabel::Gradient => "gradient",
            BackgroundLabel::Textured => "textured",
            BackgroundLabel::Complex => "complex",
        }
    }
}

impl fmt::Display for BackgroundLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy that labels a slide background.
pub trait BackgroundClassifier {
    fn classify(&self, image: &RgbImage) -> BackgroundLabel;
}

/// Variance thresholds for [`HeuristicClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    /// Edge variance below which (together with `simple_local`) the
    /// background is simple.
    pub simple_edge: f64,
    pub simple_local: f64,
    /// Edge or center variance above which the background is textured.
    pub textured_edge: f64,
    pub textured_local: f64,
    /// Edge variance above which the background is a gradient.
    pub gradient_edge: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            simple_edge: 100.0,
            simple_local: 500.0,
            textured_edge: 5000.0,
            textured_local: 10000.0,
            gradient_edge: 1000.0,
        }
    }
}

/// Mean per-channel variance of edge and center samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceProfile {
    /// Variance of pixels sampled along the four edges.
    pub color_variance: f64,
    /// Variance of pixels sampled in the center region.
    pub local_variance: f64,
}

/// Classifies by sampling edges (every ~5%) and a center square.
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier {
    thresholds: ClassifierThresholds,
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(mut self, thresholds: ClassifierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Measure edge and center variance. `None` for an empty image.
    pub fn measure(&self, image: &RgbImage) -> Option<VarianceProfile> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let x_step = (width / 20).max(1) as usize;
        let y_step = (height / 20).max(1) as usize;

        let mut edge = Vec::new();
        for x in (0..width).step_by(x_step) {
            edge.push(image.get_pixel(x, 0).0);
        }
        for x in (0..width).step_by(x_step) {
            edge.push(image.get_pixel(x, height - 1).0);
        }
        for y in (0..height).step_by(y_step) {
            edge.push(image.get_pixel(0, y).0);
        }
        for y in (0..height).step_by(y_step) {
            edge.push(image.get_pixel(width - 1, y).0);
        }

        let (center_x, center_y) = (width / 2, height / 2);
        let half = (width / 4).min(height / 4);
        let step = (half / 10).max(1) as usize;

        let mut center = Vec::new();
        for x in (center_x.saturating_sub(half)..(center_x + half).min(width)).step_by(step) {
            for y in (center_y.saturating_sub(half)..(center_y + half).min(height)).step_by(step) {
                center.push(image.get_pixel(x, y).0);
            }
        }

        Some(VarianceProfile {
            color_variance: mean_channel_variance(&edge),
            local_variance: mean_channel_variance(&center),
        })
    }

    /// Apply the thresholds to a measured profile.
    pub fn label(&self, profile: &VarianceProfile) -> BackgroundLabel {
        let t = &self.thresholds;
        if profile.color_variance < t.simple_edge && profile.local_variance < t.simple_local {
            BackgroundLabel::Simple
        } else if profile.color_variance > t.textured_edge
            || profile.local_variance > t.textured_local
        {
            BackgroundLabel::Textured
        } else if profile.color_variance > t.gradient_edge {
            BackgroundLabel::Gradient
        } else {
            BackgroundLabel::Complex
        }
    }
}

impl BackgroundClassifier for HeuristicClassifier {
    fn classify(&self, image: &RgbImage) -> BackgroundLabel {
        match self.measure(image) {
            Some(profile) => {
                let label = self.label(&profile);
                log::debug!(
                    "Background variance: edge={:.1}, center={:.1} -> {}",
                    profile.color_variance,
                    profile.local_variance,
                    label
                );
                label
            }
            None => {
                log::warn!("Cannot analyze an empty image, defaulting to 'complex'");
                BackgroundLabel::Complex
            }
        }
    }
}

/// Population variance per channel, averaged over R, G and B.
fn mean_channel_variance(pixels: &[[u8; 3]]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    let n = pixels.len() as f64;
    let mut total = 0.0;
    for channel in 0..3 {
        let mean = pixels.iter().map(|p| p[channel] as f64).sum::<f64>() / n;
        total += pixels
            .iter()
            .map(|p| (p[channel] as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
    }
    total / 3.0
}

/// Corner variance above which the background counts as a gradient.
const GRADIENT_CORNER_VARIANCE: f64 = 500.0;

/// Describe the background: dominant edge color, gradient, texture.
///
/// `label` is the classifier's verdict for the same image and decides
/// `has_texture`.
pub fn analyze_background(image: &RgbImage, label: BackgroundLabel) -> BackgroundInfo {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return BackgroundInfo {
            has_gradient: false,
            main_color: "unknown".to_string(),
            has_texture: false,
        };
    }

    let step = (width.min(height) / 20).max(1) as usize;
    let mut edge = Vec::new();
    for x in (0..width).step_by(step) {
        edge.push(image.get_pixel(x, 0).0);
        edge.push(image.get_pixel(x, height - 1).0);
    }
    for y in (0..height).step_by(step) {
        edge.push(image.get_pixel(0, y).0);
        edge.push(image.get_pixel(width - 1, y).0);
    }

    let count = edge.len() as u64;
    let mut sums = [0u64; 3];
    for pixel in &edge {
        for (sum, value) in sums.iter_mut().zip(pixel) {
            *sum += *value as u64;
        }
    }
    let average = sums.map(|sum| (sum / count) as u8);

    let corners = [
        image.get_pixel(0, 0).0,
        image.get_pixel(width - 1, 0).0,
        image.get_pixel(0, height - 1).0,
        image.get_pixel(width - 1, height - 1).0,
    ];

    BackgroundInfo {
        has_gradient: mean_channel_variance(&corners) > GRADIENT_CORNER_VARIANCE,
        main_color: color_name(average),
        has_texture: label.is_busy(),
    }
}

/// Map an RGB triple to a coarse English color name.
pub fn color_name(rgb: [u8; 3]) -> String {
    let [r, g, b] = rgb;
    let name = if r > 200 && g > 200 && b > 200 {
        "white"
    } else if r < 50 && g < 50 && b < 50 {
        "black"
    } else if r > g && r > b {
        if r > 200 {
            "red"
        } else {
            "dark red"
        }
    } else if g > r && g > b {
        if g > 200 {
            "green"
        } else {
            "dark green"
        }
    } else if b > r && b > g {
        if b > 200 {
            "blue"
        } else {
            "dark blue"
        }
    } else if r.abs_diff(g) < 30 && g.abs_diff(b) < 30 {
        if r > 150 {
            "gray"
        } else {
            "dark gray"
        }
    } else {
        return format!("rgb({},{},{})", r, g, b);
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gray(value: u8) -> Rgb<u8> {
        Rgb([value, value, value])
    }

    #[test]
    fn test_solid_background_is_simple() {
        let image = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        assert_eq!(HeuristicClassifier::new().classify(&image), BackgroundLabel::Simple);
    }

    #[test]
    fn test_mild_ramp_is_gradient() {
        let image = RgbImage::from_fn(200, 100, |x, _| gray(100 + (x / 2) as u8));
        let classifier = HeuristicClassifier::new();
        let profile = classifier.measure(&image).unwrap();
        assert!(profile.color_variance > 1000.0 && profile.color_variance < 5000.0);
        assert_eq!(classifier.classify(&image), BackgroundLabel::Gradient);
    }

    #[test]
    fn test_noise_is_textured() {
        let image = RgbImage::from_fn(200, 100, |x, y| {
            if (x * 31 + y * 17) % 3 == 0 {
                gray(255)
            } else {
                gray(0)
            }
        });
        assert_eq!(HeuristicClassifier::new().classify(&image), BackgroundLabel::Textured);
    }

    #[test]
    fn test_busy_center_on_plain_edges_is_complex() {
        let image = RgbImage::from_fn(200, 100, |x, y| {
            if (60..100).contains(&x) && (20..80).contains(&y) {
                gray(200)
            } else {
                gray(255)
            }
        });
        assert_eq!(HeuristicClassifier::new().classify(&image), BackgroundLabel::Complex);
    }

    #[test]
    fn test_empty_image_defaults_to_complex() {
        let image = RgbImage::new(0, 0);
        assert_eq!(HeuristicClassifier::new().classify(&image), BackgroundLabel::Complex);
    }

    #[test]
    fn test_custom_thresholds() {
        let image = RgbImage::from_fn(200, 100, |x, _| gray(100 + (x / 2) as u8));
        let strict = HeuristicClassifier::new().with_thresholds(ClassifierThresholds {
            gradient_edge: 5000.0,
            ..ClassifierThresholds::default()
        });
        assert_eq!(strict.classify(&image), BackgroundLabel::Complex);
    }

    #[test]
    fn test_analyze_plain_background() {
        let image = RgbImage::from_pixel(160, 90, Rgb([20, 40, 220]));
        let info = analyze_background(&image, BackgroundLabel::Simple);
        assert_eq!(info.main_color, "blue");
        assert!(!info.has_gradient);
        assert!(!info.has_texture);
    }

    #[test]
    fn test_analyze_corner_gradient() {
        let image = RgbImage::from_fn(160, 90, |x, _| gray((x * 255 / 159) as u8));
        let info = analyze_background(&image, BackgroundLabel::Textured);
        assert!(info.has_gradient);
        assert!(info.has_texture);
    }

    #[test]
    fn test_color_names() {
        assert_eq!(color_name([250, 250, 250]), "white");
        assert_eq!(color_name([10, 10, 10]), "black");
        assert_eq!(color_name([230, 20, 20]), "red");
        assert_eq!(color_name([120, 20, 20]), "dark red");
        assert_eq!(color_name([20, 220, 20]), "green");
        assert_eq!(color_name([20, 120, 20]), "dark green");
        assert_eq!(color_name([20, 20, 220]), "blue");
        assert_eq!(color_name([20, 20, 120]), "dark blue");
        assert_eq!(color_name([180, 180, 180]), "gray");
        assert_eq!(color_name([100, 100, 100]), "dark gray");
        assert_eq!(color_name([200, 200, 60]), "rgb(200,200,60)");
    }
}
