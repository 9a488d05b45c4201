//! Tile grid enumeration over a slide.
//!
//! A grid covers either the whole image or a rectangular window given in tile
//! units. Tiles on the right and bottom edges are truncated to the image and
//! are never skipped or padded, so every pixel of the covered area belongs to
//! exactly one tile.

use std::ops::Range;

use crate::error::ProcessError;

use super::coord::TileCoord;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 1024;

// =============================================================================
// Grid Region
// =============================================================================

/// Which part of the slide to cover, in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridRegion {
    /// Every tile of the image
    #[default]
    Full,

    /// `tiles_x × tiles_y` tiles starting at tile `(start_x, start_y)`
    Window {
        start_x: u32,
        start_y: u32,
        tiles_x: u32,
        tiles_y: u32,
    },
}

impl GridRegion {
    /// A window of `tiles_x × tiles_y` tiles whose top-left tile contains the
    /// center of the image.
    pub fn centered(
        image_width: u32,
        image_height: u32,
        tile_size: u32,
        tiles_x: u32,
        tiles_y: u32,
    ) -> Self {
        let tile_size = tile_size.max(1);
        GridRegion::Window {
            start_x: (image_width / 2) / tile_size,
            start_y: (image_height / 2) / tile_size,
            tiles_x,
            tiles_y,
        }
    }
}

// =============================================================================
// Tile Region
// =============================================================================

/// One tile of the grid: its origin and its (possibly truncated) size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    pub coord: TileCoord,
    pub width: u32,
    pub height: u32,
}

// =============================================================================
// Tile Grid
// =============================================================================

/// Rectangular set of tiles over an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    image_width: u32,
    image_height: u32,
    tile_size: u32,
    columns: Range<u32>,
    rows: Range<u32>,
}

impl TileGrid {
    /// Build the grid of `region` over an image, clipped to the image.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::InvalidGrid`] when `tile_size` is zero.
    pub fn new(
        image_width: u32,
        image_height: u32,
        tile_size: u32,
        region: GridRegion,
    ) -> Result<Self, ProcessError> {
        if tile_size == 0 {
            return Err(ProcessError::InvalidGrid(
                "tile size must be greater than 0".to_string(),
            ));
        }

        let total_columns = image_width.div_ceil(tile_size);
        let total_rows = image_height.div_ceil(tile_size);

        let (columns, rows) = match region {
            GridRegion::Full => (0..total_columns, 0..total_rows),
            GridRegion::Window {
                start_x,
                start_y,
                tiles_x,
                tiles_y,
            } => (
                clip(start_x, tiles_x, total_columns),
                clip(start_y, tiles_y, total_rows),
            ),
        };

        Ok(Self {
            image_width,
            image_height,
            tile_size,
            columns,
            rows,
        })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of tile columns and rows covered.
    pub fn shape(&self) -> (u32, u32) {
        (self.columns.len() as u32, self.rows.len() as u32)
    }

    /// Number of tiles in the grid.
    pub fn len(&self) -> usize {
        self.columns.len() * self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate tiles column by column (x outer, y inner).
    pub fn iter(&self) -> impl Iterator<Item = TileRegion> + '_ {
        self.columns.clone().flat_map(move |column| {
            self.rows
                .clone()
                .map(move |row| self.region(column, row))
        })
    }

    fn region(&self, column: u32, row: u32) -> TileRegion {
        let x = column * self.tile_size;
        let y = row * self.tile_size;
        TileRegion {
            coord: TileCoord::new(x, y),
            width: self.tile_size.min(self.image_width - x),
            height: self.tile_size.min(self.image_height - y),
        }
    }
}

fn clip(start: u32, count: u32, total: u32) -> Range<u32> {
    let start = start.min(total);
    let end = start.saturating_add(count).min(total);
    start..end
}

// =============================================================================
// Tests
// =============================================================================
