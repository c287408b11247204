//! Per-image segmentation: classify, ask the service, parse, normalize.

use crate::background::{
    analyze_background, BackgroundClassifier, BackgroundLabel, HeuristicClassifier,
};
use crate::config::NormalizerConfig;
use crate::error::{Error, Result};
use crate::imaging::{encode_png, image_size};
use crate::normalize::{ElementNormalizer, NormalizationReport};
use crate::prompts::prompt_for;
use crate::response::parse_response;
use crate::types::ElementSet;
use crate::vision::{VisionRequest, VisionService};
use image::DynamicImage;

/// Result of segmenting one slide image.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub elements: ElementSet,
    pub report: NormalizationReport,
    /// Background label that chose the prompt.
    pub background: BackgroundLabel,
}

/// Anything that can turn one slide image into a [`Segmentation`].
pub trait SlideSegmenter {
    fn segment(&self, name: &str, image: &DynamicImage) -> Result<Segmentation>;
}

/// Turns one slide image into a clean [`ElementSet`].
///
/// Each call is an independent unit of work; the segmenter holds no
/// per-image state.
pub struct ElementSegmenter<V, C = HeuristicClassifier> {
    service: V,
    classifier: C,
    normalizer: ElementNormalizer,
}

impl<V: VisionService> ElementSegmenter<V> {
    /// Create a segmenter using the heuristic background classifier and
    /// default thresholds.
    pub fn new(service: V) -> Self {
        Self {
            service,
            classifier: HeuristicClassifier::new(),
            normalizer: ElementNormalizer::new(),
        }
    }
}

impl<V: VisionService, C: BackgroundClassifier> ElementSegmenter<V, C> {
    /// Replace the background classifier.
    pub fn with_classifier<C2: BackgroundClassifier>(
        self,
        classifier: C2,
    ) -> ElementSegmenter<V, C2> {
        ElementSegmenter {
            service: self.service,
            classifier,
            normalizer: self.normalizer,
        }
    }

    /// Use custom normalization thresholds.
    pub fn with_config(mut self, config: NormalizerConfig) -> Self {
        self.normalizer = self.normalizer.with_config(config);
        self
    }

    pub fn normalizer(&self) -> &ElementNormalizer {
        &self.normalizer
    }

    /// Segment one image.
    ///
    /// Fails with [`Error::Upstream`] when the service call fails or answers
    /// with nothing, and with [`Error::Parse`] when the answer holds no JSON
    /// object. Both are per-image failures.
    pub fn segment(&self, name: &str, image: &DynamicImage) -> Result<Segmentation> {
        let size = image_size(image);
        if size.is_empty() {
            return Err(Error::InvalidInput(format!("image '{}' has no pixels", name)));
        }

        let rgb = image.to_rgb8();
        let background = self.classifier.classify(&rgb);
        let prompt = prompt_for(background);
        let png = encode_png(image)?;

        log::debug!(
            "Identifying elements in '{}' ({}, {} background)",
            name,
            size,
            background
        );

        let request = VisionRequest {
            name,
            png: &png,
            size,
            prompt: &prompt,
        };
        let response = self.service.identify_elements(&request)?;
        if response.trim().is_empty() {
            return Err(Error::Upstream(format!(
                "vision service returned an empty response for '{}'",
                name
            )));
        }

        let raw = parse_response(&response)?;
        let (mut elements, report) = self.normalizer.normalize_with_report(&raw, size)?;

        if elements.background_info.is_none() {
            elements.background_info = Some(analyze_background(&rgb, background));
        }

        Ok(Segmentation {
            elements,
            report,
            background,
        })
    }
}

impl<V: VisionService, C: BackgroundClassifier> SlideSegmenter for ElementSegmenter<V, C> {
    fn segment(&self, name: &str, image: &DynamicImage) -> Result<Segmentation> {
        ElementSegmenter::segment(self, name, image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::cell::RefCell;

    /// Returns a canned response and remembers the prompts it saw.
    struct MockService {
        response: std::result::Result<String, String>,
        prompts: RefCell<Vec<String>>,
    }

    impl MockService {
        fn answering(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl VisionService for MockService {
        fn identify_elements(&self, request: &VisionRequest<'_>) -> Result<String> {
            assert!(request.png.starts_with(&[0x89, b'P', b'N', b'G']));
            self.prompts.borrow_mut().push(request.prompt.to_string());
            self.response.clone().map_err(Error::Upstream)
        }
    }

    struct AlwaysTextured;

    impl BackgroundClassifier for AlwaysTextured {
        fn classify(&self, _image: &RgbImage) -> BackgroundLabel {
            BackgroundLabel::Textured
        }
    }

    fn white_slide() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 225, Rgb([255, 255, 255])))
    }

    #[test]
    fn test_segment_normalizes_response() {
        let service = MockService::answering(
            "```json\n{\"text_elements\": [{\"text\": \"Agenda\", \"bbox\": [20, 20, 200, 40], \"font_size\": 30}],\
             \"icons\": [{\"bbox\": [300, 100, 2, 2]}]}\n```",
        );
        let segmenter = ElementSegmenter::new(&service);
        let result = segmenter.segment("slide_01.png", &white_slide()).unwrap();

        assert_eq!(result.background, BackgroundLabel::Simple);
        assert_eq!(result.elements.text_elements.len(), 1);
        assert!(result.elements.icons.is_empty());
        assert_eq!(result.report.icon.too_small, 1);

        // Missing background info is filled from the image itself.
        let info = result.elements.background_info.unwrap();
        assert_eq!(info.main_color, "white");
        assert!(!info.has_texture);

        assert!(!service.prompts.borrow()[0].contains("busy background"));
    }

    #[test]
    fn test_service_background_info_wins() {
        let service = MockService::answering(
            r#"{"background_info": {"has_gradient": true, "main_color": "navy"}}"#,
        );
        let result = ElementSegmenter::new(&service)
            .segment("slide.png", &white_slide())
            .unwrap();
        assert_eq!(result.elements.background_info.as_ref().unwrap().main_color, "navy");
        assert!(result.elements.is_empty());
    }

    #[test]
    fn test_busy_background_selects_strict_prompt() {
        let service = MockService::answering("{}");
        let segmenter = ElementSegmenter::new(&service).with_classifier(AlwaysTextured);
        let result = segmenter.segment("slide.png", &white_slide()).unwrap();
        assert_eq!(result.background, BackgroundLabel::Textured);
        assert!(service.prompts.borrow()[0].contains("busy background"));
    }

    #[test]
    fn test_upstream_failure_propagates() {
        let service = MockService::failing("HTTP 503");
        let err = ElementSegmenter::new(&service)
            .segment("slide.png", &white_slide())
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(ref m) if m == "HTTP 503"));
    }

    #[test]
    fn test_empty_response_is_upstream_failure() {
        let service = MockService::answering("   ");
        let err = ElementSegmenter::new(&service)
            .segment("slide.png", &white_slide())
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[test]
    fn test_unparseable_response_is_parse_error() {
        let service = MockService::answering("Sorry, I cannot help with that.");
        let err = ElementSegmenter::new(&service)
            .segment("slide.png", &white_slide())
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_custom_config_is_used() {
        let service = MockService::answering(r#"{"icons": [{"bbox": [10, 10, 5, 5]}]}"#);
        let config = NormalizerConfig::new().with_min_area(crate::types::Category::Icon, 25.0);
        let result = ElementSegmenter::new(&service)
            .with_config(config)
            .segment("slide.png", &white_slide())
            .unwrap();
        assert_eq!(result.elements.icons.len(), 1);
    }
}
