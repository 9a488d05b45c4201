//! TileSource trait for reading RGB regions from a large image.
//!
//! The processing loop only needs two things from a slide: its full
//! resolution dimensions and the ability to read a rectangular region of
//! RGB pixels. Anything that can provide those (an OpenSlide binding, a
//! pyramidal TIFF reader, an in-memory raster) can drive the pipeline.

use std::path::Path;

use image::imageops::crop_imm;
use image::RgbImage;

use crate::error::SourceError;

/// Full-resolution pyramid level.
pub const BASE_LEVEL: usize = 0;

// =============================================================================
// TileSource Trait
// =============================================================================

/// Read-only access to RGB regions of a large image.
///
/// Implementations must be side-effect free: reading the same region twice
/// returns the same pixels.
pub trait TileSource {
    /// Dimensions of the full-resolution (level 0) image as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Read a region whose top-left corner is `(x, y)` in level-0 pixels.
    ///
    /// Regions extending past the right or bottom edge are truncated to the
    /// image, so edge tiles come back smaller than requested.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `level` is not available
    /// - the region is empty or starts outside the image
    /// - the underlying storage fails
    fn read_region(
        &self,
        x: u32,
        y: u32,
        level: usize,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, SourceError>;
}

// =============================================================================
// In-memory Source
// =============================================================================

/// Tile source backed by a single decoded raster.
///
/// Only level 0 exists. Suitable for slides exported to PNG, JPEG or plain
/// TIFF, and for synthetic images in tests.
#[derive(Debug, Clone)]
pub struct ImageTileSource {
    image: RgbImage,
    identifier: String,
}

impl ImageTileSource {
    /// Wrap an already decoded raster.
    pub fn new(image: RgbImage, identifier: impl Into<String>) -> Self {
        Self {
            image,
            identifier: identifier.into(),
        }
    }

    /// Decode an image file. Alpha channels are dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| match e {
                image::ImageError::IoError(io) => SourceError::Io(io.to_string()),
                other => SourceError::Image(other.to_string()),
            })?
            .to_rgb8();

        Ok(Self::new(image, path.display().to_string()))
    }

    /// Identifier used in log messages (the file path when opened from disk).
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl TileSource for ImageTileSource {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn read_region(
        &self,
        x: u32,
        y: u32,
        level: usize,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, SourceError> {
        if level != BASE_LEVEL {
            return Err(SourceError::UnsupportedLevel(level));
        }
        if width == 0 || height == 0 {
            return Err(SourceError::EmptyRegion);
        }

        let (image_width, image_height) = self.image.dimensions();
        if x >= image_width || y >= image_height {
            return Err(SourceError::RegionOutOfBounds {
                x,
                y,
                width: image_width,
                height: image_height,
            });
        }

        let width = width.min(image_width - x);
        let height = height.min(image_height - y);
        Ok(crop_imm(&self.image, x, y, width, height).to_image())
    }
}

// =============================================================================
// Tests
// =============================================================================
