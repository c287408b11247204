//! PPTX (Office Open XML) output for rebuilt slide decks.
//!
//! A `.pptx` file is a ZIP archive of XML parts. [`PptxWriter`] produces
//! one, [`DeckSynthesizer`] decides what goes on each slide, and
//! [`read_deck`] reads a package back for inspection.

pub mod package;
pub mod reader;
pub mod synthesizer;
pub mod writer;

pub use reader::{read_deck, DeckSummary, ShapeKind, ShapeSummary, SlideSummary};
pub use synthesizer::{DeckSynthesizer, SlideOutcome, SlideReport, SlideSource, SynthesisReport};
pub use writer::{PptxWriter, Shape, Slide};
