//! Core pipeline for rebuilding slides from flat images: parsing vision
//! service answers, normalizing detected elements, mapping them onto a
//! slide canvas, and classifying slide backgrounds.

pub mod background;
pub mod config;
pub mod error;
pub mod imaging;
pub mod mapping;
pub mod normalize;
pub mod overlay;
pub mod prompts;
pub mod response;
pub mod segmenter;
pub mod stats;
pub mod types;
pub mod vision;
pub mod xml;

pub use background::{
    analyze_background, BackgroundClassifier, BackgroundLabel, ClassifierThresholds,
    HeuristicClassifier,
};
pub use config::{CategoryRule, NormalizerConfig};
pub use error::{Error, Result};
pub use mapping::{Canvas, CoordinateMapper, MappedElement, Placement};
pub use normalize::{CategoryReport, ElementNormalizer, NormalizationReport};
pub use overlay::{render_overlay_svg, OverlayOptions};
pub use prompts::prompt_for;
pub use response::{parse_response, RawElements};
pub use segmenter::{ElementSegmenter, Segmentation, SlideSegmenter};
pub use stats::SegmentationStats;
pub use types::{
    BackgroundInfo, BoundingBox, Category, ChartElement, ElementSet, FontWeight, IconElement,
    ImageSize, TextElement,
};
pub use vision::{VisionRequest, VisionService};
