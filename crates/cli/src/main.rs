//! CLI tool for rebuilding editable PowerPoint decks from slide images.

use anyhow::{bail, Context, Result};
use clap::Parser;
use deck_core::imaging::{image_size, load_image};
use deck_core::{
    render_overlay_svg, ElementSegmenter, ElementSet, ImageSize, NormalizerConfig, OverlayOptions,
    VisionService,
};
use deck_pptx::{DeckSynthesizer, SlideSource, SynthesisReport};
use deck_vision::{GeminiClient, ReplayClient};
use std::fs;
use std::path::{Path, PathBuf};

/// Rebuild slide images as a PowerPoint deck with editable text and movable
/// icons and charts.
#[derive(Parser, Debug)]
#[command(name = "deck-rebuild")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Slide images, in slide order
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output presentation
    #[arg(short, long, default_value = "deck.pptx")]
    output: PathBuf,

    /// Place every image as a flat picture without calling the vision service
    #[arg(long)]
    no_segment: bool,

    /// Serve recorded responses from DIR (<image stem>.json or .txt) instead
    /// of calling the live service
    #[arg(long, value_name = "DIR")]
    replay: Option<PathBuf>,

    /// Write <stem>_elements.json and <stem>_overlay.svg for each segmented slide
    #[arg(long, value_name = "DIR")]
    dump: Option<PathBuf>,

    /// JSON file with normalization thresholds
    #[arg(long, value_name = "FILE")]
    thresholds: Option<PathBuf>,

    /// Print a JSON report with per-slide outcomes and element statistics
    #[arg(long)]
    stats: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config = match &args.thresholds {
        Some(path) => NormalizerConfig::from_file(path)
            .with_context(|| format!("Failed to load thresholds from {}", path.display()))?,
        None => NormalizerConfig::default(),
    };

    let (paths, sources): (Vec<PathBuf>, Vec<SlideSource>) =
        load_sources(&args.input).into_iter().unzip();
    if sources.is_empty() {
        bail!("None of the {} input image(s) could be read", args.input.len());
    }

    let segmenter =
        vision_service(&args).map(|service| ElementSegmenter::new(service).with_config(config));
    let mut synthesizer = DeckSynthesizer::new();
    if let Some(segmenter) = &segmenter {
        synthesizer = synthesizer.with_segmenter(segmenter);
    }

    let (writer, report) = synthesizer
        .build(&sources)
        .context("Failed to assemble slides")?;

    let title = args
        .output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Rebuilt presentation");
    writer
        .with_title(title)
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if let Some(dir) = &args.dump {
        dump_diagnostics(dir, &paths, &sources, &report)?;
    }

    if args.stats {
        let summary = serde_json::json!({
            "slides": &report.slides,
            "segmented": report.segmented(),
            "degraded": report.degraded(),
            "totals": report.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if args.verbose {
        eprintln!(
            "Written to: {} ({} slide(s), {} degraded)",
            args.output.display(),
            report.slides.len(),
            report.degraded()
        );
    }

    Ok(())
}

/// Decode every readable input; unreadable images are skipped.
fn load_sources(paths: &[PathBuf]) -> Vec<(PathBuf, SlideSource)> {
    let mut sources = Vec::new();
    for path in paths {
        match load_image(path) {
            Ok(image) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("slide")
                    .to_string();
                log::debug!("Loaded {} ({})", path.display(), image_size(&image));
                sources.push((path.clone(), SlideSource::new(name, image)));
            }
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    sources
}

/// Pick the vision service, or none when slides should stay flat.
fn vision_service(args: &Args) -> Option<Box<dyn VisionService>> {
    if args.no_segment {
        return None;
    }
    if let Some(dir) = &args.replay {
        log::info!("Replaying vision responses from {}", dir.display());
        return Some(Box::new(ReplayClient::new(dir)));
    }
    match GeminiClient::from_env() {
        Ok(client) => Some(Box::new(client)),
        Err(e) => {
            log::error!("{}; exporting unsegmented slides", e);
            None
        }
    }
}

fn dump_diagnostics(
    dir: &Path,
    paths: &[PathBuf],
    sources: &[SlideSource],
    report: &SynthesisReport,
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create dump directory: {}", dir.display()))?;

    for ((path, source), slide) in paths.iter().zip(sources).zip(&report.slides) {
        let Some(elements) = &slide.elements else {
            continue;
        };
        let (json_path, svg_path) = dump_paths(dir, path);
        write_dump(
            &json_path,
            &svg_path,
            elements,
            image_size(&source.image),
            path,
        )?;
        log::debug!("Dumped diagnostics for {}", source.name);
    }
    Ok(())
}

fn write_dump(
    json_path: &Path,
    svg_path: &Path,
    elements: &ElementSet,
    size: ImageSize,
    image_path: &Path,
) -> Result<()> {
    let json = serde_json::to_string_pretty(elements)?;
    fs::write(json_path, json).with_context(|| format!("Failed to write {}", json_path.display()))?;

    let href = fs::canonicalize(image_path).unwrap_or_else(|_| image_path.to_path_buf());
    let options = OverlayOptions::default().with_background(href.display().to_string());
    let svg = render_overlay_svg(elements, size, &options)?;
    fs::write(svg_path, svg).with_context(|| format!("Failed to write {}", svg_path.display()))?;
    Ok(())
}

/// `<dir>/<stem>_elements.json` and `<dir>/<stem>_overlay.svg`.
fn dump_paths(dir: &Path, image_path: &Path) -> (PathBuf, PathBuf) {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("slide");
    (
        dir.join(format!("{}_elements.json", stem)),
        dir.join(format!("{}_overlay.svg", stem)),
    )
}
