//! Tile grid processing.
//!
//! This module walks a slide tile by tile, runs stain normalization and pixel
//! classification on each tile and writes three coordinate-keyed rasters per
//! tile for later stitching.
//!
//! # Components
//!
//! - [`TileProcessor`]: main loop, orchestrates read → normalize → classify → write
//! - [`TileGrid`]: enumerates tile origins over the whole image or a window
//! - [`TileWriter`]: lossless PNG persistence under `<channel>_<x>_<y>.png`
//! - [`TileCoord`] / [`ChannelKind`] / [`TileFileName`]: the naming contract
//!   shared with the mosaic stitcher
//!
//! # Example
//!
//! ```
//! use hne_normalizer::tile::{ChannelKind, GridRegion, TileCoord, TileGrid};
//!
//! let grid = TileGrid::new(2048, 2048, 1024, GridRegion::Full).unwrap();
//! assert_eq!(grid.len(), 4);
//!
//! let name = ChannelKind::Hematoxylin.tile_file_name(TileCoord::new(1024, 0));
//! assert_eq!(name, "H_1024_0.png");
//! ```

mod coord;
mod grid;
mod processor;
mod writer;

pub use coord::{ChannelKind, TileCoord, TileFileName, RASTER_EXTENSION};
pub use grid::{GridRegion, TileGrid, TileRegion, DEFAULT_TILE_SIZE};
pub use processor::{ProcessingSummary, TileOutcome, TileProcessor};
pub use writer::{encode_png, write_png, TileWriter};
