//! Test utilities for integration tests.
//!
//! This module provides synthetic slides and tile directories with known
//! content.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

use hne_normalizer::tile::{ChannelKind, TileCoord, TileFileName, TileWriter};

/// Incident light used to synthesize stained pixels.
pub const IO: f64 = 240.0;

/// Hematoxylin OD direction (red-dominant absorbance).
pub const H_DIRECTION: [f64; 3] = [0.5626, 0.7201, 0.4062];

/// Eosin OD direction.
pub const E_DIRECTION: [f64; 3] = [0.2159, 0.8012, 0.5581];

/// Background color of synthetic slides; not tissue at the default beta.
pub const BACKGROUND: Rgb<u8> = Rgb([245, 245, 245]);

// =============================================================================
// Synthetic Slides
// =============================================================================

/// Pixel whose optical density is `concentration * direction`.
pub fn stained_pixel(direction: [f64; 3], concentration: f64) -> Rgb<u8> {
    let channel = |d: f64| {
        let value = IO * 10f64.powf(-concentration * d) - 1.0;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgb([
        channel(direction[0]),
        channel(direction[1]),
        channel(direction[2]),
    ])
}

/// A slide of 64-pixel diagonal bands: background, hematoxylin, eosin.
pub fn synthetic_slide(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let concentration = 0.8 + 0.7 * f64::from((x * 7 + y * 13) % 100) / 99.0;
        match (x / 64 + y / 64) % 3 {
            0 => BACKGROUND,
            1 => stained_pixel(H_DIRECTION, concentration),
            _ => stained_pixel(E_DIRECTION, concentration),
        }
    })
}

/// A slide with no tissue at all: light, non-uniform pixels.
pub fn pale_slide(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            200 + (x % 50) as u8,
            210 + (y % 40) as u8,
            220 + ((x + y) % 30) as u8,
        ])
    })
}

// =============================================================================
// Tile Directories
// =============================================================================

/// Write a solid `size × size` tile of `channel` at `coord`.
pub fn write_solid_tile(dir: &Path, channel: ChannelKind, coord: TileCoord, size: u32, color: [u8; 3]) {
    TileWriter::new(dir)
        .write(channel, coord, &RgbImage::from_pixel(size, size, Rgb(color)))
        .expect("failed to write tile");
}

/// Distinct solid color of grid cell `(i, j)`.
pub fn cell_color(i: u32, j: u32) -> [u8; 3] {
    [(i * 60 + 10) as u8, (j * 70 + 20) as u8, ((i + j) * 25 + 5) as u8]
}

/// Tile files of `channel` in `dir`, parsed.
pub fn tile_files(dir: &Path, channel: ChannelKind) -> BTreeSet<TileCoord> {
    fs::read_dir(dir)
        .expect("failed to list directory")
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter_map(|name| name.parse::<TileFileName>().ok())
        .filter(|parsed| parsed.channel == channel)
        .map(|parsed| parsed.coord)
        .collect()
}

/// Assert every pixel of the block at `(x, y)` of `size × size` is `color`.
pub fn assert_block(mosaic: &RgbImage, x: u32, y: u32, size: u32, color: [u8; 3]) {
    for dy in 0..size {
        for dx in 0..size {
            assert_eq!(
                mosaic.get_pixel(x + dx, y + dy),
                &Rgb(color),
                "pixel ({}, {})",
                x + dx,
                y + dy
            );
        }
    }
}
