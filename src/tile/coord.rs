//! Tile coordinates and the on-disk naming convention.
//!
//! Per-tile rasters are stored as `<channel>_<x>_<y>.png`, where `x` and `y`
//! are the tile's top-left origin in level-0 pixels, decimal, unpadded.
//! Mosaics are stored as `<channel>_stitched.png`.
//!
//! File names are parsed into a [`TileFileName`] as soon as they are read so
//! that nothing past the directory listing deals with raw strings.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::StitchError;

/// Extension of every raster written by this crate.
pub const RASTER_EXTENSION: &str = "png";

// =============================================================================
// Tile Coordinate
// =============================================================================

/// Top-left origin of a tile in level-0 pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// =============================================================================
// Channel Kind
// =============================================================================

/// The three raster types written per tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
pub enum ChannelKind {
    /// Stain-normalized RGB tile
    #[value(name = "normalized")]
    Normalized,

    /// Hematoxylin-only rendering
    #[value(name = "H", alias = "h")]
    Hematoxylin,

    /// Eosin-only rendering
    #[value(name = "E", alias = "e")]
    Eosin,
}

impl ChannelKind {
    /// All channel kinds, in the order they are written and stitched.
    pub const ALL: [ChannelKind; 3] = [
        ChannelKind::Normalized,
        ChannelKind::Hematoxylin,
        ChannelKind::Eosin,
    ];

    /// File name prefix of this channel.
    pub fn prefix(&self) -> &'static str {
        match self {
            ChannelKind::Normalized => "normalized",
            ChannelKind::Hematoxylin => "H",
            ChannelKind::Eosin => "E",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.prefix() == prefix)
    }

    /// `<prefix>_<x>_<y>.png`
    pub fn tile_file_name(&self, coord: TileCoord) -> String {
        format!(
            "{}_{}_{}.{}",
            self.prefix(),
            coord.x,
            coord.y,
            RASTER_EXTENSION
        )
    }

    /// `<prefix>_stitched.png`
    pub fn stitched_file_name(&self) -> String {
        format!("{}_stitched.{}", self.prefix(), RASTER_EXTENSION)
    }

    /// Whether `file_name` belongs to this channel (`<prefix>_*.png`).
    ///
    /// This only checks the pattern; the coordinate part may still be
    /// malformed.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.prefix())
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|rest| rest.ends_with(&format!(".{}", RASTER_EXTENSION)))
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

// =============================================================================
// Tile File Name
// =============================================================================

/// A parsed `<channel>_<x>_<y>.png` file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileFileName {
    pub channel: ChannelKind,
    pub coord: TileCoord,
}

impl TileFileName {
    pub fn new(channel: ChannelKind, coord: TileCoord) -> Self {
        Self { channel, coord }
    }
}

impl fmt::Display for TileFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.channel.tile_file_name(self.coord))
    }
}

impl FromStr for TileFileName {
    type Err = StitchError;

    fn from_str(file_name: &str) -> Result<Self, Self::Err> {
        let parse_error = || StitchError::CoordinateParse {
            file_name: file_name.to_string(),
        };

        let stem = file_name
            .strip_suffix(RASTER_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(parse_error)?;

        // y, then x, then whatever remains must be a channel prefix
        let mut parts = stem.rsplitn(3, '_');
        let y = parts.next().and_then(parse_origin).ok_or_else(parse_error)?;
        let x = parts.next().and_then(parse_origin).ok_or_else(parse_error)?;
        let channel = parts
            .next()
            .and_then(ChannelKind::from_prefix)
            .ok_or_else(parse_error)?;

        Ok(Self::new(channel, TileCoord::new(x, y)))
    }
}

/// Plain decimal digits only; rejects signs and empty strings.
fn parse_origin(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// =============================================================================
// Tests
// =============================================================================
