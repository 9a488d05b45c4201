//! Configuration management for the H&E normalizer.
//!
//! This module provides the command-line interface:
//! - Subcommands via clap (`process`, `stitch`, `normalize`)
//! - Environment variables with `HNE_` prefix
//! - Defaults matching the reference Macenko parameters
//!
//! # Environment Variables
//!
//! - `HNE_INPUT` - Input image to process
//! - `HNE_OUTPUT_DIR` - Directory for per-tile rasters (default: output_images)
//! - `HNE_TILE_SIZE` - Tile edge length in pixels (default: 1024)
//! - `HNE_IO` - Incident light intensity (default: 240)
//! - `HNE_ALPHA` - Angle percentile cutoff (default: 1)
//! - `HNE_BETA` - OD background threshold (default: 0.15)
//! - `HNE_THRESHOLD` - Classification threshold (default: 0.1)
//! - `HNE_REPORT` - Summary report path (default: summary.txt)
//! - `HNE_STITCHED_DIR` - Directory for mosaics (default: stitched)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::report::ReportFormat;
use crate::stain::{
    NormalizerParams, DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_CLASSIFICATION_THRESHOLD, DEFAULT_IO,
};
use crate::tile::{ChannelKind, GridRegion, DEFAULT_TILE_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default directory for per-tile rasters.
pub const DEFAULT_OUTPUT_DIR: &str = "output_images";

/// Default directory for stitched mosaics.
pub const DEFAULT_STITCHED_DIR: &str = "stitched";

/// Default summary report path.
pub const DEFAULT_REPORT_PATH: &str = "summary.txt";

// =============================================================================
// CLI Arguments
// =============================================================================

/// H&E Normalizer - Macenko stain normalization for whole slide images.
///
/// Splits a slide into tiles, normalizes each tile's stain appearance,
/// separates hematoxylin and eosin, and stitches the tiles back into mosaics.
#[derive(Parser, Debug, Clone)]
#[command(name = "hne-normalizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Normalize every tile of a slide and write per-tile rasters
    Process(ProcessConfig),

    /// Stitch per-tile rasters back into mosaics
    Stitch(StitchConfig),

    /// Normalize a single image without tiling
    Normalize(NormalizeConfig),
}

/// Stain normalization parameters shared by `process` and `normalize`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct StainArgs {
    /// Incident light intensity.
    #[arg(long = "io", default_value_t = DEFAULT_IO, env = "HNE_IO")]
    pub io: f64,

    /// Percentile cutoff for the robust stain angle bounds.
    #[arg(long, default_value_t = DEFAULT_ALPHA, env = "HNE_ALPHA")]
    pub alpha: f64,

    /// Optical density threshold below which pixels are background.
    #[arg(long, default_value_t = DEFAULT_BETA, env = "HNE_BETA")]
    pub beta: f64,
}

impl Default for StainArgs {
    fn default() -> Self {
        Self {
            io: DEFAULT_IO,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
        }
    }
}

impl StainArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.io > 0.0) {
            return Err("io must be greater than 0".to_string());
        }
        if !(0.0..50.0).contains(&self.alpha) {
            return Err("alpha must be in [0, 50)".to_string());
        }
        if !(self.beta >= 0.0) {
            return Err("beta must be non-negative".to_string());
        }
        Ok(())
    }

    pub fn normalizer_params(&self) -> NormalizerParams {
        NormalizerParams {
            io: self.io,
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}

// =============================================================================
// Process Command
// =============================================================================

/// Configuration for the `process` command.
#[derive(Args, Debug, Clone)]
pub struct ProcessConfig {
    /// Slide image to process (PNG, JPEG or TIFF).
    #[arg(long, env = "HNE_INPUT")]
    pub input: PathBuf,

    /// Directory receiving `<channel>_<x>_<y>.png` tiles.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "HNE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Tile edge length in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "HNE_TILE_SIZE")]
    pub tile_size: u32,

    #[command(flatten)]
    pub stain: StainArgs,

    /// Classification threshold as a fraction of full intensity.
    #[arg(long, default_value_t = DEFAULT_CLASSIFICATION_THRESHOLD, env = "HNE_THRESHOLD")]
    pub threshold: f64,

    /// First tile column of the processing window.
    #[arg(long)]
    pub start_x: Option<u32>,

    /// First tile row of the processing window.
    #[arg(long)]
    pub start_y: Option<u32>,

    /// Number of tile columns in the window.
    #[arg(long)]
    pub tiles_x: Option<u32>,

    /// Number of tile rows in the window.
    #[arg(long)]
    pub tiles_y: Option<u32>,

    /// Start the window at the tile containing the image center.
    ///
    /// Requires --tiles-x and --tiles-y.
    #[arg(long, default_value_t = false, conflicts_with_all = ["start_x", "start_y"])]
    pub centered: bool,

    /// Summary report path.
    #[arg(long, default_value = DEFAULT_REPORT_PATH, env = "HNE_REPORT")]
    pub report: PathBuf,

    /// Summary report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report_format: ReportFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ProcessConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }

        self.stain.validate()?;

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err("threshold must be between 0 and 1".to_string());
        }

        let start_given = [self.start_x, self.start_y].iter().filter(|v| v.is_some()).count();
        let size_given = [self.tiles_x, self.tiles_y].iter().filter(|v| v.is_some()).count();

        if self.centered {
            if size_given != 2 {
                return Err("--centered requires --tiles-x and --tiles-y".to_string());
            }
        } else if start_given + size_given != 0 && start_given + size_given != 4 {
            return Err(
                "window requires all of --start-x, --start-y, --tiles-x and --tiles-y".to_string(),
            );
        }

        Ok(())
    }

    /// Grid region for an image of the given dimensions.
    ///
    /// Call `validate()` first; incomplete windows fall back to the full image.
    pub fn grid_region(&self, image_width: u32, image_height: u32) -> GridRegion {
        match (self.start_x, self.start_y, self.tiles_x, self.tiles_y) {
            (_, _, Some(tiles_x), Some(tiles_y)) if self.centered => GridRegion::centered(
                image_width,
                image_height,
                self.tile_size,
                tiles_x,
                tiles_y,
            ),
            (Some(start_x), Some(start_y), Some(tiles_x), Some(tiles_y)) => GridRegion::Window {
                start_x,
                start_y,
                tiles_x,
                tiles_y,
            },
            _ => GridRegion::Full,
        }
    }
}

// =============================================================================
// Stitch Command
// =============================================================================

/// Configuration for the `stitch` command.
#[derive(Args, Debug, Clone)]
pub struct StitchConfig {
    /// Directory containing `<channel>_<x>_<y>.png` tiles.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, env = "HNE_OUTPUT_DIR")]
    pub input_dir: PathBuf,

    /// Directory receiving `<channel>_stitched.png` mosaics.
    #[arg(long, default_value = DEFAULT_STITCHED_DIR, env = "HNE_STITCHED_DIR")]
    pub output_dir: PathBuf,

    /// Channels to stitch (repeatable). Defaults to all three.
    #[arg(long = "channel", value_enum)]
    pub channels: Vec<ChannelKind>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl StitchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.input_dir == self.output_dir {
            return Err("input_dir and output_dir must differ".to_string());
        }
        Ok(())
    }

    /// Requested channels, or all channels when none were given.
    pub fn channels(&self) -> Vec<ChannelKind> {
        if self.channels.is_empty() {
            ChannelKind::ALL.to_vec()
        } else {
            self.channels.clone()
        }
    }
}

// =============================================================================
// Normalize Command
// =============================================================================

/// Configuration for the `normalize` command.
#[derive(Args, Debug, Clone)]
pub struct NormalizeConfig {
    /// Image to normalize.
    #[arg(long)]
    pub input: PathBuf,

    /// Directory receiving normalized.png, H.png and E.png.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub stain: StainArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl NormalizeConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.stain.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
