//! Mosaic stitching from coordinate-keyed tile rasters.
//!
//! Stitching is a separate pass over the tile directory and shares nothing
//! with the processing run that produced it. Each channel is stitched
//! independently; a channel without tiles is skipped with a warning so the
//! remaining channels still complete.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::replace;
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::StitchError;
use crate::tile::{write_png, ChannelKind, TileCoord, TileFileName};

use super::layout::{MosaicGrid, PlacedTile};

/// A tile file discovered in the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TileFile {
    coord: TileCoord,
    path: PathBuf,
}

/// A mosaic written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StitchedMosaic {
    pub channel: ChannelKind,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub tiles: usize,
}

// =============================================================================
// Mosaic Stitcher
// =============================================================================

/// Reassembles per-tile rasters of one directory into mosaics.
///
/// # Example
///
/// ```no_run
/// use hne_normalizer::mosaic::MosaicStitcher;
/// use hne_normalizer::tile::ChannelKind;
///
/// # fn main() -> Result<(), hne_normalizer::StitchError> {
/// let stitcher = MosaicStitcher::new("output_images");
/// let mosaics = stitcher.stitch_all(&ChannelKind::ALL, "stitched")?;
/// for mosaic in mosaics {
///     println!("{}: {}x{}", mosaic.channel, mosaic.width, mosaic.height);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MosaicStitcher {
    input_dir: PathBuf,
}

impl MosaicStitcher {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Assemble the mosaic of one channel in memory.
    ///
    /// Returns `Ok(None)` when the directory holds no tiles of `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file of this channel has a malformed coordinate,
    /// or if the directory or a tile cannot be read.
    pub fn stitch(&self, channel: ChannelKind) -> Result<Option<RgbImage>, StitchError> {
        Ok(self.assemble(channel)?.map(|(mosaic, _)| mosaic))
    }

    /// Assemble one channel and write `<output_dir>/<channel>_stitched.png`.
    pub fn stitch_to(
        &self,
        channel: ChannelKind,
        output_dir: impl AsRef<Path>,
    ) -> Result<Option<StitchedMosaic>, StitchError> {
        let Some((mosaic, tiles)) = self.assemble(channel)? else {
            return Ok(None);
        };

        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir).map_err(|e| StitchError::Io {
            path: output_dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let path = output_dir.join(channel.stitched_file_name());
        write_png(&path, &mosaic).map_err(|e| StitchError::Image {
            path: path.clone(),
            message: e.to_string(),
        })?;
        info!("Saved {}", path.display());

        Ok(Some(StitchedMosaic {
            channel,
            path,
            width: mosaic.width(),
            height: mosaic.height(),
            tiles,
        }))
    }

    /// Stitch each of `channels` into `output_dir`.
    ///
    /// Channels without tiles are skipped. Any other error aborts the run.
    pub fn stitch_all(
        &self,
        channels: &[ChannelKind],
        output_dir: impl AsRef<Path>,
    ) -> Result<Vec<StitchedMosaic>, StitchError> {
        let mut mosaics = Vec::with_capacity(channels.len());
        for &channel in channels {
            if let Some(mosaic) = self.stitch_to(channel, output_dir.as_ref())? {
                mosaics.push(mosaic);
            }
        }
        info!("Stitching complete: {} mosaic(s)", mosaics.len());
        Ok(mosaics)
    }

    /// Build the mosaic of a channel, returning it with its tile count.
    fn assemble(&self, channel: ChannelKind) -> Result<Option<(RgbImage, usize)>, StitchError> {
        info!("Stitching {} images...", channel);

        let files = self.discover(channel)?;
        if files.is_empty() {
            warn!(
                "No {} tiles found in {}, skipping",
                channel,
                self.input_dir.display()
            );
            return Ok(None);
        }

        let mut placed = Vec::with_capacity(files.len());
        for file in &files {
            let (width, height) =
                image::image_dimensions(&file.path).map_err(|e| StitchError::Image {
                    path: file.path.clone(),
                    message: e.to_string(),
                })?;
            placed.push(PlacedTile {
                coord: file.coord,
                width,
                height,
            });
        }

        let grid = MosaicGrid::from_tiles(&placed);
        let (width, height) = grid.dimensions();
        let (columns, rows) = grid.shape();
        info!(
            "Found {} tiles ({} columns x {} rows), creating {}x{} {} mosaic",
            files.len(),
            columns,
            rows,
            width,
            height,
            channel
        );

        let mut mosaic = RgbImage::new(width, height);
        for file in &files {
            let Some((paste_x, paste_y)) = grid.position(file.coord) else {
                continue;
            };

            let tile = image::open(&file.path)
                .map_err(|e| StitchError::Image {
                    path: file.path.clone(),
                    message: e.to_string(),
                })?
                .to_rgb8();
            replace(&mut mosaic, &tile, i64::from(paste_x), i64::from(paste_y));

            debug!(
                "Placed tile {} at ({}, {})",
                file.coord, paste_x, paste_y
            );
        }

        Ok(Some((mosaic, files.len())))
    }

    /// List and parse the tile files of one channel, sorted by row then column.
    fn discover(&self, channel: ChannelKind) -> Result<Vec<TileFile>, StitchError> {
        let io_error = |e: std::io::Error| StitchError::Io {
            path: self.input_dir.clone(),
            message: e.to_string(),
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.input_dir).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !channel.matches_file_name(file_name) {
                continue;
            }

            let parsed: TileFileName = file_name.parse()?;
            if parsed.channel != channel {
                return Err(StitchError::CoordinateParse {
                    file_name: file_name.to_string(),
                });
            }
            files.push(TileFile {
                coord: parsed.coord,
                path: entry.path(),
            });
        }

        files.sort_by_key(|f| (f.coord.y, f.coord.x));
        Ok(files)
    }
}

// =============================================================================
// Tests
// =============================================================================
