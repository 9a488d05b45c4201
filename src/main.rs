//! H&E Normalizer - Macenko stain normalization for whole slide images.
//!
//! This binary wires the CLI to the tile processing and stitching passes.

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hne_normalizer::{
    config::{Cli, Command, NormalizeConfig, ProcessConfig, StitchConfig},
    mosaic::MosaicStitcher,
    report::SummaryReport,
    slide::{ImageTileSource, TileSource},
    stain::{PixelClassifier, StainNormalizer, StainReference},
    tile::{write_png, TileGrid, TileProcessor, TileWriter},
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Process(config) => run_process(config),
        Command::Stitch(config) => run_stitch(config),
        Command::Normalize(config) => run_normalize(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "hne_normalizer=debug"
    } else {
        "hne_normalizer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Process Command
// =============================================================================

fn run_process(config: ProcessConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let source = match ImageTileSource::open(&config.input) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let (width, height) = source.dimensions();
    let region = config.grid_region(width, height);
    let grid = match TileGrid::new(width, height, config.tile_size, region) {
        Ok(grid) => grid,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let processor = TileProcessor::new(
        StainNormalizer::new(config.stain.normalizer_params(), StainReference::default()),
        PixelClassifier::new(config.threshold),
        TileWriter::new(&config.output_dir),
    );
    let params = processor.normalizer().params();
    let reference = processor.normalizer().reference();

    let (columns, rows) = grid.shape();
    info!("Configuration:");
    info!("  Slide: {} ({} x {} pixels)", source.identifier(), width, height);
    info!(
        "  Grid: {} x {} tiles of {} px ({:?})",
        columns,
        rows,
        grid.tile_size(),
        region
    );
    info!(
        "  Stain: Io = {}, alpha = {}, beta = {}",
        params.io, params.alpha, params.beta
    );
    debug!(
        "  Reference max concentrations: H = {:.4}, E = {:.4}",
        reference.max_concentrations[0], reference.max_concentrations[1]
    );
    info!("  Threshold: {}", processor.classifier().threshold());
    info!("  Output: {}", processor.writer().output_dir().display());

    if grid.is_empty() {
        warn!("Grid is empty, nothing to process");
    }

    let summary = match processor.process(&source, &grid) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Processing failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = SummaryReport::from_summary(&summary);
    for line in report.to_text().lines() {
        info!("{}", line);
    }
    if let Err(e) = report.write(&config.report, config.report_format) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }
    info!("Analysis complete! Results saved to {}", config.report.display());

    if !summary.failed_tiles.is_empty() {
        warn!("{} tile(s) failed", summary.failed_tiles.len());
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Stitch Command
// =============================================================================

fn run_stitch(config: StitchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let stitcher = MosaicStitcher::new(&config.input_dir);
    info!("Stitching tiles from {}", stitcher.input_dir().display());
    match stitcher.stitch_all(&config.channels(), &config.output_dir) {
        Ok(mosaics) if mosaics.is_empty() => {
            warn!("No tiles found in {}", stitcher.input_dir().display());
            ExitCode::FAILURE
        }
        Ok(mosaics) => {
            for mosaic in &mosaics {
                info!(
                    "  {}: {} x {} from {} tiles -> {}",
                    mosaic.channel,
                    mosaic.width,
                    mosaic.height,
                    mosaic.tiles,
                    mosaic.path.display()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Stitching failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Normalize Command
// =============================================================================

fn run_normalize(config: NormalizeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let image = match image::open(&config.input) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
            error!("Failed to open {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let normalizer =
        StainNormalizer::new(config.stain.normalizer_params(), StainReference::default());
    let outcome = normalizer.normalize(&image);
    if !outcome.is_separated() {
        warn!("No stain separation possible, writing the original image");
    }
    let (normalized, hematoxylin, eosin, _) = outcome.into_rasters(&image);

    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        error!("Cannot create {}: {}", config.output_dir.display(), e);
        return ExitCode::FAILURE;
    }

    for (name, raster) in [
        ("normalized.png", &normalized),
        ("H.png", &hematoxylin),
        ("E.png", &eosin),
    ] {
        let path = config.output_dir.join(name);
        if let Err(e) = write_png(&path, raster) {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
        info!("Saved {}", path.display());
    }

    ExitCode::SUCCESS
}
