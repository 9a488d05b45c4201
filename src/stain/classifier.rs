//! Pixel classification into nuclei, cytoplasm and background.
//!
//! Counts are computed per tile from the normalizer outputs and summed by the
//! processing loop. A tile that fell back carries no stain signal, so all of
//! its pixels count as background.
//!
//! Intensities use the ITU-R BT.601 luma weights (0.299, 0.587, 0.114) and
//! are compared unrounded against the cut.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use image::{Rgb, RgbImage};
use serde::Serialize;

use super::normalizer::{NormalizationOutcome, StainChannels};

/// Default classification threshold, as a fraction of full intensity.
pub const DEFAULT_CLASSIFICATION_THRESHOLD: f64 = 0.1;

/// BT.601 luma weights for red, green and blue.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

// =============================================================================
// Pixel Counts
// =============================================================================

/// Categorical pixel counts for one tile or a whole run.
///
/// `purple + background <= total` always holds. `pink` is the number of
/// eosin pixels minus the number of hematoxylin pixels, floored at zero; it
/// is a tile-level difference, not a per-pixel label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PixelCounts {
    /// Hematoxylin-dominant (nuclei) pixels
    pub purple: u64,

    /// Eosin-dominant (cytoplasm) pixels
    pub pink: u64,

    /// Background pixels
    pub background: u64,

    /// All pixels examined
    pub total: u64,
}

impl PixelCounts {
    /// Counts for a tile with no stain signal.
    pub fn background_only(total: u64) -> Self {
        Self {
            purple: 0,
            pink: 0,
            background: total,
            total,
        }
    }

    pub fn purple_percent(&self) -> f64 {
        percent(self.purple, self.total)
    }

    pub fn pink_percent(&self) -> f64 {
        percent(self.pink, self.total)
    }

    pub fn background_percent(&self) -> f64 {
        percent(self.background, self.total)
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl Add for PixelCounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for PixelCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.purple += rhs.purple;
        self.pink += rhs.pink;
        self.background += rhs.background;
        self.total += rhs.total;
    }
}

impl Sum for PixelCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Threshold-based pixel classifier over normalizer outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelClassifier {
    threshold: f64,
}

impl Default for PixelClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSIFICATION_THRESHOLD)
    }
}

impl PixelClassifier {
    /// Create a classifier. `threshold` is a fraction of 255.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify the pixels of `tile` given its normalization outcome.
    pub fn classify(&self, outcome: &NormalizationOutcome, tile: &RgbImage) -> PixelCounts {
        match outcome.channels() {
            Some(channels) => self.count_channels(channels),
            None => PixelCounts::background_only(pixel_total(tile)),
        }
    }

    /// Classify separated channels.
    ///
    /// `purple` counts pixels whose hematoxylin intensity exceeds the cut.
    /// `pink` is the count of pixels whose eosin intensity exceeds the cut
    /// minus `purple`, floored at zero. `background` counts pixels whose
    /// normalized intensity is below the cut and that are not purple.
    pub fn count_channels(&self, channels: &StainChannels) -> PixelCounts {
        let cut = self.threshold * 255.0;

        let mut purple = 0u64;
        let mut eosin = 0u64;
        let mut background = 0u64;

        let pixels = channels
            .hematoxylin
            .pixels()
            .zip(channels.eosin.pixels())
            .zip(channels.normalized.pixels());

        for ((h, e), n) in pixels {
            let is_purple = luma(h) > cut;
            if is_purple {
                purple += 1;
            }
            if luma(e) > cut {
                eosin += 1;
            }
            if !is_purple && luma(n) < cut {
                background += 1;
            }
        }

        PixelCounts {
            purple,
            pink: eosin.saturating_sub(purple),
            background,
            total: pixel_total(&channels.normalized),
        }
    }
}

/// BT.601 luma of an 8-bit RGB pixel, on the 0..=255 scale.
fn luma(pixel: &Rgb<u8>) -> f64 {
    pixel
        .0
        .iter()
        .zip(LUMA_WEIGHTS)
        .map(|(&v, w)| f64::from(v) * w)
        .sum()
}

fn pixel_total(img: &RgbImage) -> u64 {
    u64::from(img.width()) * u64::from(img.height())
}

// =============================================================================
// Tests
// =============================================================================
