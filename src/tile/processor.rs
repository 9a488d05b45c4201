//! Tile processing loop.
//!
//! The TileProcessor drives the per-tile pipeline over a grid:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        TileProcessor                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                 process_tile()                          │    │
//! │  │  1. Read region        3. Classify pixels               │    │
//! │  │  2. Normalize stains   4. Write normalized / H / E      │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌────────────┐   ┌──────────────────┐    ┌──────────────┐    │
//! │    │ TileSource │   │ StainNormalizer  │    │  TileWriter  │    │
//! │    └────────────┘   │ PixelClassifier  │    └──────────────┘    │
//! │                     └──────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every grid cell is processed, blank ones included, so the written tile set
//! always forms a complete grid for stitching. A tile that fails to read or
//! write is logged and skipped; it never stops the rest of the grid.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ProcessError;
use crate::slide::{TileSource, BASE_LEVEL};
use crate::stain::{PixelClassifier, PixelCounts, StainNormalizer};

use super::coord::{ChannelKind, TileCoord};
use super::grid::{TileGrid, TileRegion};
use super::writer::TileWriter;

// =============================================================================
// Results
// =============================================================================

/// Result of processing one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileOutcome {
    /// Tile origin
    pub coord: TileCoord,

    /// Pixel counts of this tile
    pub counts: PixelCounts,

    /// Whether stain separation succeeded (false for fallback tiles)
    pub separated: bool,
}

/// Totals over a processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    /// Tiles read, normalized and written
    pub tiles_processed: usize,

    /// Processed tiles that fell back to the original pixels
    pub tiles_fallback: usize,

    /// Tiles that could not be read or written; none of their rasters are
    /// left on disk
    pub failed_tiles: Vec<TileCoord>,

    /// Accumulated pixel counts over processed tiles
    pub counts: PixelCounts,
}

impl ProcessingSummary {
    fn record(&mut self, outcome: &TileOutcome) {
        self.tiles_processed += 1;
        if !outcome.separated {
            self.tiles_fallback += 1;
        }
        self.counts += outcome.counts;
    }
}

// =============================================================================
// Tile Processor
// =============================================================================

/// Runs normalization and classification over a tile grid and persists the
/// per-tile rasters.
///
/// # Example
///
/// ```no_run
/// use hne_normalizer::slide::{ImageTileSource, TileSource};
/// use hne_normalizer::stain::{PixelClassifier, StainNormalizer};
/// use hne_normalizer::tile::{GridRegion, TileGrid, TileProcessor, TileWriter};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = ImageTileSource::open("slide.png")?;
/// let (width, height) = source.dimensions();
/// let grid = TileGrid::new(width, height, 1024, GridRegion::Full)?;
///
/// let processor = TileProcessor::new(
///     StainNormalizer::default(),
///     PixelClassifier::default(),
///     TileWriter::new("output_images"),
/// );
/// let summary = processor.process(&source, &grid)?;
/// println!("{} tiles, {} pixels", summary.tiles_processed, summary.counts.total);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TileProcessor {
    normalizer: StainNormalizer,
    classifier: PixelClassifier,
    writer: TileWriter,
}

impl TileProcessor {
    pub fn new(normalizer: StainNormalizer, classifier: PixelClassifier, writer: TileWriter) -> Self {
        Self {
            normalizer,
            classifier,
            writer,
        }
    }

    pub fn normalizer(&self) -> &StainNormalizer {
        &self.normalizer
    }

    pub fn classifier(&self) -> &PixelClassifier {
        &self.classifier
    }

    pub fn writer(&self) -> &TileWriter {
        &self.writer
    }

    /// Process every tile of `grid`.
    ///
    /// # Errors
    ///
    /// Only failing to create the output directory is fatal. Per-tile
    /// failures are collected in [`ProcessingSummary::failed_tiles`].
    pub fn process<S: TileSource>(
        &self,
        source: &S,
        grid: &TileGrid,
    ) -> Result<ProcessingSummary, ProcessError> {
        self.writer.ensure_output_dir()?;

        let total = grid.len();
        let mut summary = ProcessingSummary::default();

        for (index, region) in grid.iter().enumerate() {
            info!(
                "Processing tile {}/{} at {}",
                index + 1,
                total,
                region.coord
            );

            match self.process_tile(source, &region) {
                Ok(outcome) => {
                    debug!(
                        "Tile {}: {} purple, {} pink, {} background pixels",
                        outcome.coord,
                        outcome.counts.purple,
                        outcome.counts.pink,
                        outcome.counts.background
                    );
                    summary.record(&outcome);
                }
                Err(e) => {
                    warn!("Tile {} failed: {}", region.coord, e);
                    summary.failed_tiles.push(region.coord);
                }
            }
        }

        info!(
            "Processed {} tiles ({} without stain signal, {} failed)",
            summary.tiles_processed,
            summary.tiles_fallback,
            summary.failed_tiles.len()
        );

        Ok(summary)
    }

    /// Read, normalize, classify and write a single tile.
    ///
    /// The three rasters are written together: on a write error none of
    /// them remain.
    pub fn process_tile<S: TileSource>(
        &self,
        source: &S,
        region: &TileRegion,
    ) -> Result<TileOutcome, ProcessError> {
        let coord = region.coord;
        let tile = source.read_region(coord.x, coord.y, BASE_LEVEL, region.width, region.height)?;

        let outcome = self.normalizer.normalize(&tile);
        let counts = self.classifier.classify(&outcome, &tile);
        let separated = outcome.is_separated();

        let (normalized, hematoxylin, eosin, _) = outcome.into_rasters(&tile);
        self.writer.write_tile(
            coord,
            &[
                (ChannelKind::Normalized, &normalized),
                (ChannelKind::Hematoxylin, &hematoxylin),
                (ChannelKind::Eosin, &eosin),
            ],
        )?;

        Ok(TileOutcome {
            coord,
            counts,
            separated,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::slide::ImageTileSource;
    use crate::tile::grid::GridRegion;
    use image::{Rgb, RgbImage};

    /// Source that fails for one origin and delegates otherwise.
    struct FlakySource {
        inner: ImageTileSource,
        failing: TileCoord,
    }

    impl TileSource for FlakySource {
        fn dimensions(&self) -> (u32, u32) {
            self.inner.dimensions()
        }

        fn read_region(
            &self,
            x: u32,
            y: u32,
            level: usize,
            width: u32,
            height: u32,
        ) -> Result<RgbImage, SourceError> {
            if TileCoord::new(x, y) == self.failing {
                return Err(SourceError::Io("simulated read failure".to_string()));
            }
            self.inner.read_region(x, y, level, width, height)
        }
    }

    fn processor(dir: &std::path::Path) -> TileProcessor {
        TileProcessor::new(
            StainNormalizer::default(),
            PixelClassifier::default(),
            TileWriter::new(dir),
        )
    }

    fn blank_source(width: u32, height: u32) -> ImageTileSource {
        ImageTileSource::new(
            RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
            "blank",
        )
    }

    #[test]
    fn test_blank_tiles_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let source = blank_source(40, 40);
        let grid = TileGrid::new(40, 40, 20, GridRegion::Full).unwrap();

        let summary = processor(dir.path()).process(&source, &grid).unwrap();

        assert_eq!(summary.tiles_processed, 4);
        assert_eq!(summary.tiles_fallback, 4);
        assert!(summary.failed_tiles.is_empty());
        assert_eq!(summary.counts, PixelCounts::background_only(1600));

        for coord in [(0, 0), (20, 0), (0, 20), (20, 20)] {
            for channel in ChannelKind::ALL {
                let path = dir
                    .path()
                    .join(channel.tile_file_name(TileCoord::new(coord.0, coord.1)));
                assert!(path.exists(), "missing {}", path.display());
            }
        }
    }

    #[test]
    fn test_fallback_tile_written_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let source = blank_source(10, 10);
        let processor = processor(dir.path());
        processor.writer().ensure_output_dir().unwrap();

        let region = TileRegion {
            coord: TileCoord::new(0, 0),
            width: 10,
            height: 10,
        };
        let outcome = processor.process_tile(&source, &region).unwrap();
        assert!(!outcome.separated);

        let written = image::open(dir.path().join("H_0_0.png")).unwrap().to_rgb8();
        assert_eq!(written, RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
    }

    #[test]
    fn test_edge_tiles_keep_truncated_size() {
        let dir = tempfile::tempdir().unwrap();
        let source = blank_source(30, 25);
        let grid = TileGrid::new(30, 25, 20, GridRegion::Full).unwrap();

        let summary = processor(dir.path()).process(&source, &grid).unwrap();
        assert_eq!(summary.tiles_processed, 4);
        assert_eq!(summary.counts.total, 30 * 25);

        let corner = image::open(dir.path().join("normalized_20_20.png")).unwrap();
        assert_eq!((corner.width(), corner.height()), (10, 5));
    }

    #[test]
    fn test_failing_tile_does_not_stop_grid() {
        let dir = tempfile::tempdir().unwrap();
        let source = FlakySource {
            inner: blank_source(40, 40),
            failing: TileCoord::new(20, 0),
        };
        let grid = TileGrid::new(40, 40, 20, GridRegion::Full).unwrap();

        let summary = processor(dir.path()).process(&source, &grid).unwrap();

        assert_eq!(summary.tiles_processed, 3);
        assert_eq!(summary.failed_tiles, vec![TileCoord::new(20, 0)]);
        assert_eq!(summary.counts.total, 1200);
        assert!(!dir.path().join("E_20_0.png").exists());
        assert!(dir.path().join("E_20_20.png").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_partial_tile() {
        let dir = tempfile::tempdir().unwrap();
        let source = blank_source(40, 20);
        let grid = TileGrid::new(40, 20, 20, GridRegion::Full).unwrap();

        // The eosin raster of the second tile cannot be written
        std::fs::create_dir(dir.path().join("E_20_0.png")).unwrap();

        let summary = processor(dir.path()).process(&source, &grid).unwrap();

        assert_eq!(summary.tiles_processed, 1);
        assert_eq!(summary.failed_tiles, vec![TileCoord::new(20, 0)]);
        assert!(!dir.path().join("normalized_20_0.png").exists());
        assert!(!dir.path().join("H_20_0.png").exists());
        for channel in ChannelKind::ALL {
            assert!(dir.path().join(channel.tile_file_name(TileCoord::new(0, 0))).exists());
        }
    }

    #[test]
    fn test_accessors_expose_components() {
        let processor = TileProcessor::new(
            StainNormalizer::default(),
            PixelClassifier::new(0.25),
            TileWriter::new("tiles"),
        );

        assert_eq!(processor.normalizer().params().io, 240.0);
        assert_eq!(processor.classifier().threshold(), 0.25);
        assert_eq!(processor.writer().output_dir(), std::path::Path::new("tiles"));
    }

    #[test]
    fn test_unwritable_output_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let source = blank_source(10, 10);
        let grid = TileGrid::new(10, 10, 10, GridRegion::Full).unwrap();
        let result = processor(&blocker.join("tiles")).process(&source, &grid);

        assert!(matches!(result, Err(ProcessError::OutputDir { .. })));
    }
}
