//! PNG tile writer.
//!
//! Tiles are always written losslessly so that stitched mosaics reproduce the
//! processed pixels exactly. File names are a pure function of channel and
//! coordinate, which makes rewriting a tile idempotent.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use tracing::warn;

use crate::error::ProcessError;

use super::coord::{ChannelKind, TileCoord};

// =============================================================================
// Tile Writer
// =============================================================================

/// Writes per-tile rasters into one output directory.
#[derive(Debug, Clone)]
pub struct TileWriter {
    output_dir: PathBuf,
}

impl TileWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory (and parents) if missing.
    pub fn ensure_output_dir(&self) -> Result<(), ProcessError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| ProcessError::OutputDir {
            path: self.output_dir.clone(),
            message: e.to_string(),
        })
    }

    /// Path a tile of `channel` at `coord` is written to.
    pub fn tile_path(&self, channel: ChannelKind, coord: TileCoord) -> PathBuf {
        self.output_dir.join(channel.tile_file_name(coord))
    }

    /// Encode and write one tile raster.
    pub fn write(
        &self,
        channel: ChannelKind,
        coord: TileCoord,
        raster: &RgbImage,
    ) -> Result<PathBuf, ProcessError> {
        let path = self.tile_path(channel, coord);
        write_png(&path, raster)?;
        Ok(path)
    }

    /// Write every raster of one tile, or none of them.
    ///
    /// If a write fails, the rasters of this tile written before it are
    /// removed so the channels never disagree about which tiles exist.
    pub fn write_tile(
        &self,
        coord: TileCoord,
        rasters: &[(ChannelKind, &RgbImage)],
    ) -> Result<Vec<PathBuf>, ProcessError> {
        let mut written = Vec::with_capacity(rasters.len());

        for &(channel, raster) in rasters {
            match self.write(channel, coord, raster) {
                Ok(path) => written.push(path),
                Err(e) => {
                    for path in &written {
                        if let Err(remove_err) = fs::remove_file(path) {
                            warn!("Cannot remove partial tile {}: {}", path.display(), remove_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(written)
    }
}

/// Encode `raster` as PNG and write it to `path`.
pub fn write_png(path: &Path, raster: &RgbImage) -> Result<(), ProcessError> {
    let data = encode_png(raster).map_err(|message| ProcessError::Write {
        path: path.to_path_buf(),
        message,
    })?;

    fs::write(path, data).map_err(|e| ProcessError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Encode an RGB raster as PNG bytes.
pub fn encode_png(raster: &RgbImage) -> Result<Vec<u8>, String> {
    let mut output = Vec::new();
    PngEncoder::new(&mut output)
        .write_image(
            raster.as_raw(),
            raster.width(),
            raster.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| e.to_string())?;
    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================
