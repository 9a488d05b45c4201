//! Mosaic reconstruction from per-tile rasters.
//!
//! - [`MosaicStitcher`]: discovers `<channel>_<x>_<y>.png` files and writes
//!   `<channel>_stitched.png`
//! - [`MosaicGrid`]: maps tile origins to column/row offsets

mod layout;
mod stitcher;

pub use layout::{MosaicGrid, PlacedTile};
pub use stitcher::{MosaicStitcher, StitchedMosaic};
