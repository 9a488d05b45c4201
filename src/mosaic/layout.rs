//! Mosaic grid layout derived from observed tile origins.
//!
//! Placement is index based: the distinct x origins, sorted, become columns
//! and the distinct y origins become rows. A tile's position never depends on
//! how many tiles precede it, so gaps in the grid leave holes instead of
//! shifting later tiles.
//!
//! Each column is as wide as its widest tile and each row as tall as its
//! tallest tile. For uniform tiles this is `index × tile_size`; truncated edge
//! tiles (always in the last column or row) shrink only their own column or
//! row.

use std::collections::BTreeMap;

use crate::tile::TileCoord;

/// A tile as seen by the layout: origin and actual raster size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedTile {
    pub coord: TileCoord,
    pub width: u32,
    pub height: u32,
}

/// Column and row offsets of a mosaic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicGrid {
    /// Sorted distinct x origins, one per column
    x_origins: Vec<u32>,

    /// Sorted distinct y origins, one per row
    y_origins: Vec<u32>,

    /// Pixel offset of each column in the mosaic
    column_offsets: Vec<u32>,

    /// Pixel offset of each row in the mosaic
    row_offsets: Vec<u32>,

    width: u32,
    height: u32,
}

impl MosaicGrid {
    /// Build the layout for a set of tiles.
    pub fn from_tiles(tiles: &[PlacedTile]) -> Self {
        let mut column_widths: BTreeMap<u32, u32> = BTreeMap::new();
        let mut row_heights: BTreeMap<u32, u32> = BTreeMap::new();

        for tile in tiles {
            let width = column_widths.entry(tile.coord.x).or_insert(0);
            *width = (*width).max(tile.width);
            let height = row_heights.entry(tile.coord.y).or_insert(0);
            *height = (*height).max(tile.height);
        }

        let (x_origins, column_offsets, width) = cumulative(&column_widths);
        let (y_origins, row_offsets, height) = cumulative(&row_heights);

        Self {
            x_origins,
            y_origins,
            column_offsets,
            row_offsets,
            width,
            height,
        }
    }

    /// Mosaic size as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of columns and rows.
    pub fn shape(&self) -> (usize, usize) {
        (self.x_origins.len(), self.y_origins.len())
    }

    pub fn column_of(&self, x: u32) -> Option<usize> {
        self.x_origins.binary_search(&x).ok()
    }

    pub fn row_of(&self, y: u32) -> Option<usize> {
        self.y_origins.binary_search(&y).ok()
    }

    /// Pixel position of the tile with origin `coord` in the mosaic.
    ///
    /// Returns `None` for origins not seen when the layout was built.
    pub fn position(&self, coord: TileCoord) -> Option<(u32, u32)> {
        let column = self.column_of(coord.x)?;
        let row = self.row_of(coord.y)?;
        Some((self.column_offsets[column], self.row_offsets[row]))
    }
}

/// Keys, running offsets and total extent of an ordered size map.
fn cumulative(sizes: &BTreeMap<u32, u32>) -> (Vec<u32>, Vec<u32>, u32) {
    let mut origins = Vec::with_capacity(sizes.len());
    let mut offsets = Vec::with_capacity(sizes.len());
    let mut extent = 0u32;

    for (&origin, &size) in sizes {
        origins.push(origin);
        offsets.push(extent);
        extent += size;
    }

    (origins, offsets, extent)
}

// =============================================================================
// Tests
// =============================================================================
