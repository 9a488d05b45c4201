//! Mosaic stitching integration tests.
//!
//! Tests verify:
//! - Solid-color tile grids stitch back with exact block placement
//! - Missing tiles leave a black hole without shifting neighbors
//! - Truncated edge tiles keep their true size in the mosaic
//! - Channels are stitched independently of each other

use image::{Rgb, RgbImage};

use hne_normalizer::error::StitchError;
use hne_normalizer::mosaic::MosaicStitcher;
use hne_normalizer::slide::ImageTileSource;
use hne_normalizer::stain::{PixelClassifier, StainNormalizer};
use hne_normalizer::tile::{
    ChannelKind, GridRegion, TileCoord, TileGrid, TileProcessor, TileWriter,
};

use super::test_utils::{assert_block, cell_color, pale_slide, write_solid_tile};

const K: u32 = 16;

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_solid_grid_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3 {
        for j in 0..2 {
            let coord = TileCoord::new(i * K, j * K);
            write_solid_tile(dir.path(), ChannelKind::Normalized, coord, K, cell_color(i, j));
        }
    }

    let mosaic = MosaicStitcher::new(dir.path())
        .stitch(ChannelKind::Normalized)
        .unwrap()
        .unwrap();

    assert_eq!(mosaic.dimensions(), (3 * K, 2 * K));
    for i in 0..3 {
        for j in 0..2 {
            assert_block(&mosaic, i * K, j * K, K, cell_color(i, j));
        }
    }
}

#[test]
fn test_missing_middle_tile_leaves_hole() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3 {
        for j in 0..3 {
            if (i, j) == (1, 1) {
                continue;
            }
            let coord = TileCoord::new(i * K, j * K);
            write_solid_tile(dir.path(), ChannelKind::Eosin, coord, K, cell_color(i, j));
        }
    }

    let mosaic = MosaicStitcher::new(dir.path())
        .stitch(ChannelKind::Eosin)
        .unwrap()
        .unwrap();

    assert_eq!(mosaic.dimensions(), (3 * K, 3 * K));
    assert_block(&mosaic, K, K, K, [0, 0, 0]);
    for i in 0..3 {
        for j in 0..3 {
            if (i, j) != (1, 1) {
                assert_block(&mosaic, i * K, j * K, K, cell_color(i, j));
            }
        }
    }
}

#[test]
fn test_processed_fallback_slide_restores_original() {
    let dir = tempfile::tempdir().unwrap();
    let tiles_dir = dir.path().join("tiles");
    let slide = pale_slide(250, 130);

    let source = ImageTileSource::new(slide.clone(), "pale");
    let grid = TileGrid::new(250, 130, 100, GridRegion::Full).unwrap();
    let processor = TileProcessor::new(
        StainNormalizer::default(),
        PixelClassifier::default(),
        TileWriter::new(&tiles_dir),
    );
    let summary = processor.process(&source, &grid).unwrap();
    assert_eq!(summary.tiles_processed, 6);
    assert_eq!(summary.tiles_fallback, 6);

    let stitcher = MosaicStitcher::new(&tiles_dir);
    for channel in ChannelKind::ALL {
        let mosaic = stitcher.stitch(channel).unwrap().unwrap();
        assert_eq!(mosaic, slide, "{} mosaic differs from the slide", channel);
    }
}

// =============================================================================
// Channels
// =============================================================================

#[test]
fn test_channels_stitched_independently() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stitched");
    for i in 0..2 {
        let coord = TileCoord::new(i * K, 0);
        write_solid_tile(dir.path(), ChannelKind::Normalized, coord, K, [10, 20, 30]);
        write_solid_tile(dir.path(), ChannelKind::Eosin, coord, K, [200, 100, 150]);
    }
    // Hematoxylin only has a single tile
    write_solid_tile(
        dir.path(),
        ChannelKind::Hematoxylin,
        TileCoord::new(0, 0),
        K,
        [90, 0, 90],
    );

    let stitcher = MosaicStitcher::new(dir.path());
    let hematoxylin = stitcher.stitch(ChannelKind::Hematoxylin).unwrap().unwrap();
    assert_eq!(hematoxylin.dimensions(), (K, K));

    std::fs::remove_file(dir.path().join("H_0_0.png")).unwrap();
    let mosaics = stitcher.stitch_all(&ChannelKind::ALL, &out).unwrap();

    let channels: Vec<ChannelKind> = mosaics.iter().map(|m| m.channel).collect();
    assert_eq!(channels, vec![ChannelKind::Normalized, ChannelKind::Eosin]);
    assert!(!out.join("H_stitched.png").exists());

    let eosin = image::open(out.join("E_stitched.png")).unwrap().to_rgb8();
    assert_eq!(eosin, RgbImage::from_pixel(2 * K, K, Rgb([200, 100, 150])));
}

#[test]
fn test_stitched_output_in_input_dir_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_solid_tile(
        dir.path(),
        ChannelKind::Normalized,
        TileCoord::new(0, 0),
        K,
        [1, 2, 3],
    );

    let stitcher = MosaicStitcher::new(dir.path());
    let out = dir.path().join("stitched");
    stitcher.stitch_all(&[ChannelKind::Normalized], &out).unwrap();

    // A mosaic next to the tiles carries no origin
    std::fs::copy(
        out.join("normalized_stitched.png"),
        dir.path().join("normalized_stitched.png"),
    )
    .unwrap();

    assert!(matches!(
        stitcher.stitch(ChannelKind::Normalized),
        Err(StitchError::CoordinateParse { .. })
    ));
    // Other channels are unaffected
    assert!(stitcher.stitch(ChannelKind::Eosin).unwrap().is_none());
}

#[test]
fn test_empty_directory_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let stitcher = MosaicStitcher::new(dir.path());

    assert!(stitcher.stitch(ChannelKind::Normalized).unwrap().is_none());
    assert!(stitcher
        .stitch_all(&ChannelKind::ALL, dir.path().join("out"))
        .unwrap()
        .is_empty());
}

#[test]
fn test_missing_input_dir_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let stitcher = MosaicStitcher::new(dir.path().join("absent"));

    assert!(matches!(
        stitcher.stitch(ChannelKind::Eosin),
        Err(StitchError::Io { .. })
    ));
}
