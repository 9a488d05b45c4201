//! Tile processing integration tests.
//!
//! Tests verify:
//! - A 2048×2048 slide in 1024 tiles yields four rasters per channel
//! - Stitching the written tiles restores full-size mosaics
//! - Pixel counts obey their invariants across a run
//! - Windows and blank regions are processed without gaps

use hne_normalizer::mosaic::MosaicStitcher;
use hne_normalizer::report::{ReportFormat, SummaryReport};
use hne_normalizer::slide::{ImageTileSource, TileSource};
use hne_normalizer::stain::{PixelClassifier, StainNormalizer, MAX_OUTPUT_VALUE};
use hne_normalizer::tile::{
    ChannelKind, GridRegion, TileCoord, TileGrid, TileProcessor, TileWriter,
};

use super::test_utils::{pale_slide, synthetic_slide, tile_files};

fn processor(dir: &std::path::Path) -> TileProcessor {
    TileProcessor::new(
        StainNormalizer::default(),
        PixelClassifier::default(),
        TileWriter::new(dir),
    )
}

// =============================================================================
// End-to-end
// =============================================================================

#[test]
fn test_end_to_end_2048_slide() {
    let dir = tempfile::tempdir().unwrap();
    let tiles_dir = dir.path().join("output_images");
    let stitched_dir = dir.path().join("stitched");

    let source = ImageTileSource::new(synthetic_slide(2048, 2048), "synthetic");
    let grid = TileGrid::new(2048, 2048, 1024, GridRegion::Full).unwrap();
    let summary = processor(&tiles_dir).process(&source, &grid).unwrap();

    assert_eq!(summary.tiles_processed, 4);
    assert_eq!(summary.tiles_fallback, 0);
    assert!(summary.failed_tiles.is_empty());
    assert_eq!(summary.counts.total, 2048 * 2048);

    let expected: Vec<TileCoord> = vec![
        TileCoord::new(0, 0),
        TileCoord::new(0, 1024),
        TileCoord::new(1024, 0),
        TileCoord::new(1024, 1024),
    ];
    for channel in ChannelKind::ALL {
        let found: Vec<TileCoord> = tile_files(&tiles_dir, channel).into_iter().collect();
        assert_eq!(found, expected, "tiles of {}", channel);
    }

    let mosaics = MosaicStitcher::new(&tiles_dir)
        .stitch_all(&ChannelKind::ALL, &stitched_dir)
        .unwrap();
    assert_eq!(mosaics.len(), 3);
    for mosaic in &mosaics {
        assert_eq!((mosaic.width, mosaic.height), (2048, 2048));
        assert_eq!(mosaic.tiles, 4);
        assert!(stitched_dir.join(mosaic.channel.stitched_file_name()).exists());
    }
}

#[test]
fn test_stitched_mosaic_matches_tiles() {
    let dir = tempfile::tempdir().unwrap();
    let source = ImageTileSource::new(synthetic_slide(512, 512), "synthetic");
    let grid = TileGrid::new(512, 512, 256, GridRegion::Full).unwrap();
    processor(dir.path()).process(&source, &grid).unwrap();

    let mosaic = MosaicStitcher::new(dir.path())
        .stitch(ChannelKind::Hematoxylin)
        .unwrap()
        .unwrap();
    let tile = image::open(dir.path().join("H_256_0.png")).unwrap().to_rgb8();

    for y in 0..256 {
        for x in 0..256 {
            assert_eq!(mosaic.get_pixel(256 + x, y), tile.get_pixel(x, y));
        }
    }
}

#[test]
fn test_separated_outputs_respect_clamp() {
    let dir = tempfile::tempdir().unwrap();
    let source = ImageTileSource::new(synthetic_slide(256, 256), "synthetic");
    let grid = TileGrid::new(256, 256, 128, GridRegion::Full).unwrap();
    let summary = processor(dir.path()).process(&source, &grid).unwrap();
    assert_eq!(summary.tiles_fallback, 0);

    for channel in ChannelKind::ALL {
        for coord in tile_files(dir.path(), channel) {
            let raster = image::open(dir.path().join(channel.tile_file_name(coord)))
                .unwrap()
                .to_rgb8();
            assert!(raster
                .pixels()
                .all(|p| p.0.iter().all(|&v| v <= MAX_OUTPUT_VALUE)));
        }
    }
}

// =============================================================================
// Pixel Counts
// =============================================================================

#[test]
fn test_counts_invariant_per_tile() {
    let dir = tempfile::tempdir().unwrap();
    let source = ImageTileSource::new(synthetic_slide(300, 200), "synthetic");
    let grid = TileGrid::new(300, 200, 100, GridRegion::Full).unwrap();
    let processor = processor(dir.path());
    processor.writer().ensure_output_dir().unwrap();

    let mut total = 0;
    for region in grid.iter() {
        let outcome = processor.process_tile(&source, &region).unwrap();
        let counts = outcome.counts;
        assert!(counts.purple + counts.background <= counts.total);
        assert_eq!(counts.total, u64::from(region.width * region.height));
        total += counts.total;
    }
    assert_eq!(total, 300 * 200);
}

#[test]
fn test_blank_slide_all_background() {
    let dir = tempfile::tempdir().unwrap();
    let source = ImageTileSource::new(pale_slide(200, 200), "pale");
    let grid = TileGrid::new(200, 200, 100, GridRegion::Full).unwrap();
    let summary = processor(dir.path()).process(&source, &grid).unwrap();

    assert_eq!(summary.tiles_processed, 4);
    assert_eq!(summary.tiles_fallback, 4);
    assert_eq!(summary.counts.background, 40_000);
    assert_eq!(summary.counts.purple, 0);
    assert_eq!(summary.counts.pink, 0);

    let report = SummaryReport::from_summary(&summary);
    assert!(report
        .render(ReportFormat::Text)
        .unwrap()
        .contains("Background: 100.0% (40,000 pixels)"));
}

// =============================================================================
// Grid Regions
// =============================================================================

#[test]
fn test_centered_window() {
    let dir = tempfile::tempdir().unwrap();
    let source = ImageTileSource::new(pale_slide(300, 300), "pale");
    let (width, height) = source.dimensions();
    let region = GridRegion::centered(width, height, 100, 2, 2);
    let grid = TileGrid::new(width, height, 100, region).unwrap();

    let summary = processor(dir.path()).process(&source, &grid).unwrap();
    assert_eq!(summary.tiles_processed, 4);

    let found: Vec<TileCoord> = tile_files(dir.path(), ChannelKind::Normalized)
        .into_iter()
        .collect();
    assert_eq!(
        found,
        vec![
            TileCoord::new(100, 100),
            TileCoord::new(100, 200),
            TileCoord::new(200, 100),
            TileCoord::new(200, 200),
        ]
    );
}

#[test]
fn test_rerun_overwrites_identically() {
    let dir = tempfile::tempdir().unwrap();
    let source = ImageTileSource::new(synthetic_slide(128, 128), "synthetic");
    let grid = TileGrid::new(128, 128, 128, GridRegion::Full).unwrap();

    let first = processor(dir.path()).process(&source, &grid).unwrap();
    let bytes = std::fs::read(dir.path().join("E_0_0.png")).unwrap();
    let second = processor(dir.path()).process(&source, &grid).unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read(dir.path().join("E_0_0.png")).unwrap(), bytes);
    assert_eq!(tile_files(dir.path(), ChannelKind::Eosin).len(), 1);
}
