use std::path::PathBuf;

use thiserror::Error;

/// Reasons a tile cannot be stain-separated.
///
/// These never abort processing: the normalizer reports them inside
/// [`crate::stain::NormalizationOutcome::Fallback`] and the tile is passed
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StainError {
    /// Too few pixels carry stain signal (mostly background or blank tile)
    #[error("Insufficient tissue: {found} tissue pixels, need at least {required}")]
    InsufficientTissue { found: usize, required: usize },

    /// Covariance or stain matrix is numerically singular
    #[error("Degenerate stain statistics: {0}")]
    DegenerateStatistics(String),
}

/// Errors raised by a tile source when reading pixels
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The underlying image could not be decoded
    #[error("Image decode error: {0}")]
    Image(String),

    /// File system error while opening the source
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested region starts outside the image
    #[error("Region ({x}, {y}) out of bounds for {width}x{height} image")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// Requested region has zero width or height
    #[error("Requested region is empty")]
    EmptyRegion,

    /// Only full-resolution reads are supported
    #[error("Unsupported level {0}: only level 0 is available")]
    UnsupportedLevel(usize),
}

/// Errors from the tile processing loop
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// Grid parameters cannot produce tiles
    #[error("Invalid tile grid: {0}")]
    InvalidGrid(String),

    /// Output directory could not be created
    #[error("Cannot create output directory {path}: {message}")]
    OutputDir { path: PathBuf, message: String },

    /// A tile raster could not be encoded or written
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// Tile source failure
    #[error("Tile source error: {0}")]
    Source(#[from] SourceError),
}

/// Errors that can occur while stitching tiles into a mosaic
#[derive(Debug, Clone, Error)]
pub enum StitchError {
    /// File name matched a channel prefix but carries no valid coordinate
    #[error("Cannot parse tile coordinate from file name '{file_name}'")]
    CoordinateParse { file_name: String },

    /// Directory listing or file system failure
    #[error("I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Tile or mosaic raster could not be read or written
    #[error("Image error at {path}: {message}")]
    Image { path: PathBuf, message: String },
}
