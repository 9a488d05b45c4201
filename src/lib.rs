//! # H&E Normalizer
//!
//! Macenko stain normalization for Hematoxylin & Eosin stained histology
//! slides, processed tile by tile and reassembled into mosaics.
//!
//! Slides are far too large to normalize in one piece, so the library walks
//! a grid of tiles, separates and normalizes the stains of each tile against
//! a shared reference, and writes three rasters per tile keyed by the tile's
//! pixel origin. A later, independent pass stitches those rasters back into
//! full mosaics.
//!
//! ## Features
//!
//! - **Macenko stain separation**: per-tile stain vectors from the optical
//!   density eigen-plane, normalized to a fixed reference
//! - **Blank tile handling**: background-only or degenerate tiles pass through
//!   unchanged instead of failing the run
//! - **Pixel classification**: nuclei / cytoplasm / background counts per
//!   tile and per slide
//! - **Index-based stitching**: tiles placed by their origin's rank, tolerant
//!   of gaps and truncated edge tiles
//!
//! ## Architecture
//!
//! - [`slide`] - TileSource trait and an in-memory raster source
//! - [`stain`] - Macenko normalizer and pixel classifier
//! - [`tile`] - Grid enumeration, processing loop, tile naming and writing
//! - [`mosaic`] - Mosaic layout and stitching
//! - [`report`] - Summary report rendering
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use hne_normalizer::{
//!     ChannelKind, GridRegion, ImageTileSource, MosaicStitcher, PixelClassifier,
//!     StainNormalizer, TileGrid, TileProcessor, TileSource, TileWriter,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ImageTileSource::open("slide.tif")?;
//! let (width, height) = source.dimensions();
//! let grid = TileGrid::new(width, height, 1024, GridRegion::Full)?;
//!
//! let processor = TileProcessor::new(
//!     StainNormalizer::default(),
//!     PixelClassifier::default(),
//!     TileWriter::new("output_images"),
//! );
//! let summary = processor.process(&source, &grid)?;
//! println!("Purple: {:.1}%", summary.counts.purple_percent());
//!
//! // Later, possibly in another process
//! MosaicStitcher::new("output_images").stitch_all(&ChannelKind::ALL, "stitched")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mosaic;
pub mod report;
pub mod slide;
pub mod stain;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, NormalizeConfig, ProcessConfig, StainArgs, StitchConfig};
pub use error::{ProcessError, SourceError, StainError, StitchError};
pub use mosaic::{MosaicGrid, MosaicStitcher, PlacedTile, StitchedMosaic};
pub use report::{ReportFormat, SummaryReport};
pub use slide::{ImageTileSource, TileSource, BASE_LEVEL};
pub use stain::{
    NormalizationOutcome, NormalizerParams, PixelClassifier, PixelCounts, StainChannels,
    StainNormalizer, StainReference,
};
pub use tile::{
    ChannelKind, GridRegion, ProcessingSummary, TileCoord, TileFileName, TileGrid, TileOutcome,
    TileProcessor, TileRegion, TileWriter,
};
