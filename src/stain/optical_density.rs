//! Optical density conversion and the small statistics the Macenko fit needs.
//!
//! Percentiles use linear interpolation between the two closest ranks, so
//! results line up with the common numerical definition of a percentile on
//! sorted samples.

use nalgebra::{Matrix3, Vector3};

/// Convert an 8-bit RGB pixel to optical density.
///
/// `OD = -log10((value + 1) / io)` per channel. The `+ 1` keeps black pixels
/// finite.
#[inline]
pub fn optical_density(rgb: [u8; 3], io: f64) -> Vector3<f64> {
    Vector3::new(
        channel_density(rgb[0], io),
        channel_density(rgb[1], io),
        channel_density(rgb[2], io),
    )
}

#[inline]
fn channel_density(value: u8, io: f64) -> f64 {
    -((f64::from(value) + 1.0) / io).log10()
}

/// A sample carries stain signal when every channel reaches `beta`.
#[inline]
pub fn is_tissue(od: &Vector3<f64>, beta: f64) -> bool {
    od.iter().all(|&v| v >= beta)
}

/// Sort samples so they can be passed to [`percentile_of_sorted`].
pub fn sort_samples(values: &mut [f64]) {
    values.sort_unstable_by(f64::total_cmp);
}

/// The `p`-th percentile (0..=100) of already sorted samples.
///
/// Returns `NaN` for an empty slice.
pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let fraction = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Sample covariance (n - 1 denominator) of 3-vectors.
///
/// Callers guarantee at least two samples.
pub fn covariance(samples: &[Vector3<f64>]) -> Matrix3<f64> {
    let n = samples.len() as f64;
    let mean = samples.iter().fold(Vector3::zeros(), |acc, s| acc + s) / n;

    let scatter = samples.iter().fold(Matrix3::zeros(), |acc, s| {
        let centered = s - mean;
        acc + centered * centered.transpose()
    });

    scatter / (n - 1.0)
}

// =============================================================================
// Tests
// =============================================================================
