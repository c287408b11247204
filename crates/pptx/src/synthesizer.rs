//! Assembles slides from images, rebuilding editable elements where the
//! segmenter succeeds and falling back to a flat picture where it does not.

use crate::writer::{PptxWriter, Slide};
use deck_core::imaging::{crop_region, encode_png, image_size};
use deck_core::mapping::Canvas;
use deck_core::{
    CoordinateMapper, ElementSet, NormalizationReport, Result, SegmentationStats, SlideSegmenter,
};
use image::DynamicImage;
use serde::Serialize;

/// One input image and the name it is reported under.
pub struct SlideSource {
    pub name: String,
    pub image: DynamicImage,
}

impl SlideSource {
    pub fn new(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }
}

/// How a slide ended up in the deck.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SlideOutcome {
    /// Background plus editable text boxes and cropped pictures.
    Segmented { texts: usize, pictures: usize },
    /// Segmentation failed; the slide is the flat source image.
    Fallback { reason: String },
    /// Segmentation was not requested.
    Unsegmented,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: SlideOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SegmentationStats>,
    #[serde(skip)]
    pub normalization: Option<NormalizationReport>,
    /// Detected elements, kept for diagnostics.
    #[serde(skip)]
    pub elements: Option<ElementSet>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SynthesisReport {
    pub slides: Vec<SlideReport>,
}

impl SynthesisReport {
    /// Slides that fell back to a flat picture.
    pub fn degraded(&self) -> usize {
        self.slides
            .iter()
            .filter(|s| matches!(s.outcome, SlideOutcome::Fallback { .. }))
            .count()
    }

    pub fn segmented(&self) -> usize {
        self.slides
            .iter()
            .filter(|s| matches!(s.outcome, SlideOutcome::Segmented { .. }))
            .count()
    }

    /// Statistics summed over every segmented slide.
    pub fn stats(&self) -> SegmentationStats {
        let mut total = SegmentationStats::default();
        for stats in self.slides.iter().filter_map(|s| s.stats) {
            total += stats;
        }
        total
    }
}

/// Builds a presentation from slide images.
pub struct DeckSynthesizer<'a> {
    canvas: Canvas,
    segmenter: Option<&'a dyn SlideSegmenter>,
}

impl<'a> DeckSynthesizer<'a> {
    /// A synthesizer that places every image as a flat full-bleed picture.
    pub fn new() -> Self {
        Self {
            canvas: Canvas::widescreen_emu(),
            segmenter: None,
        }
    }

    /// Rebuild editable elements with the given segmenter.
    pub fn with_segmenter(mut self, segmenter: &'a dyn SlideSegmenter) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    /// Use another page size; dimensions are in EMU.
    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = canvas;
        self
    }

    /// Build one slide per source, in order.
    ///
    /// A slide whose segmentation fails is placed flat and reported as
    /// degraded; only a failure to encode the source image itself is fatal.
    pub fn build(&self, sources: &[SlideSource]) -> Result<(PptxWriter, SynthesisReport)> {
        let mut writer = PptxWriter::new().with_canvas(self.canvas);
        let mut report = SynthesisReport::default();

        for source in sources {
            let (slide, slide_report) = self.build_slide(source)?;
            writer.add_slide(slide);
            report.slides.push(slide_report);
        }

        if report.degraded() > 0 {
            log::warn!(
                "{} of {} slide(s) fell back to flat images",
                report.degraded(),
                report.slides.len()
            );
        }
        Ok((writer, report))
    }

    /// Build a single slide and describe how it was produced.
    pub fn build_slide(&self, source: &SlideSource) -> Result<(Slide, SlideReport)> {
        let background = encode_png(&source.image)?;

        let Some(segmenter) = self.segmenter else {
            return Ok((
                Slide::full_bleed(background, &self.canvas),
                SlideReport {
                    name: source.name.clone(),
                    outcome: SlideOutcome::Unsegmented,
                    stats: None,
                    normalization: None,
                    elements: None,
                },
            ));
        };

        match self.segmented_slide(segmenter, source, background.clone()) {
            Ok(built) => {
                log::info!(
                    "Rebuilt '{}' with {} text box(es) and {} picture(s)",
                    source.name,
                    built.1.texts_placed(),
                    built.1.pictures_placed()
                );
                Ok(built)
            }
            Err(e) => {
                log::warn!(
                    "Segmentation failed for '{}': {}, falling back to flat image",
                    source.name,
                    e
                );
                Ok((
                    Slide::full_bleed(background, &self.canvas),
                    SlideReport {
                        name: source.name.clone(),
                        outcome: SlideOutcome::Fallback {
                            reason: e.to_string(),
                        },
                        stats: None,
                        normalization: None,
                        elements: None,
                    },
                ))
            }
        }
    }

    fn segmented_slide(
        &self,
        segmenter: &dyn SlideSegmenter,
        source: &SlideSource,
        background: Vec<u8>,
    ) -> Result<(Slide, SlideReport)> {
        let segmentation = segmenter.segment(&source.name, &source.image)?;
        let mapper = CoordinateMapper::new(self.canvas, image_size(&source.image))?;
        let elements = segmentation.elements;

        // Bottom layer: the untouched source image.
        let mut slide = Slide::full_bleed(background, &self.canvas);

        let mut texts = 0;
        for text in &elements.text_elements {
            let content = text.text.trim();
            if content.is_empty() {
                continue;
            }
            let (placement, size_pt) = mapper.map_text(text);
            slide.add_text(placement, content, size_pt, text.font_weight.is_bold());
            texts += 1;
        }

        let visuals = elements
            .icons
            .iter()
            .map(|icon| ("Icon", &icon.bbox))
            .chain(elements.charts.iter().map(|chart| ("Chart", &chart.bbox)));

        let mut pictures = 0;
        for (idx, (kind, bbox)) in visuals.enumerate() {
            let png = match crop_region(&source.image, bbox).and_then(|crop| encode_png(&crop)) {
                Ok(png) => png,
                Err(e) => {
                    log::warn!("Skipping {} at {} in '{}': {}", kind, bbox, source.name, e);
                    continue;
                }
            };
            slide.add_picture(mapper.map_bbox(bbox), png, &format!("{} {}", kind, idx + 1));
            pictures += 1;
        }

        let report = SlideReport {
            name: source.name.clone(),
            outcome: SlideOutcome::Segmented { texts, pictures },
            stats: Some(SegmentationStats::from(&elements)),
            normalization: Some(segmentation.report),
            elements: Some(elements),
        };
        Ok((slide, report))
    }
}

impl Default for DeckSynthesizer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideReport {
    fn texts_placed(&self) -> usize {
        match self.outcome {
            SlideOutcome::Segmented { texts, .. } => texts,
            _ => 0,
        }
    }

    fn pictures_placed(&self) -> usize {
        match self.outcome {
            SlideOutcome::Segmented { pictures, .. } => pictures,
            _ => 0,
        }
    }
}
