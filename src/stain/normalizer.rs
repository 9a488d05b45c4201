//! Macenko stain separation and normalization for a single tile.
//!
//! The normalizer estimates the two stain directions of a tile in optical
//! density space, solves per-pixel stain concentrations, rescales them to a
//! reference maximum and re-renders the tile through a fixed reference stain
//! matrix. Because the reference is shared, tiles from different regions or
//! slides come out with comparable color.
//!
//! # Algorithm
//!
//! 1. Convert pixels to optical density (OD) and keep tissue samples, the
//!    ones whose every OD channel reaches `beta`.
//! 2. Eigendecompose the covariance of the tissue samples and project them
//!    onto the plane of the two dominant eigenvectors.
//! 3. Take the `alpha` and `100 - alpha` percentile angles in that plane as
//!    the two stain directions. The one with the larger red component is
//!    hematoxylin.
//! 4. Least-squares fit every pixel's OD against the stain matrix, normalize
//!    by the 99th percentile concentration and render with the reference.
//!
//! Tiles without enough tissue, or whose statistics are singular, are not an
//! error: they come back as [`NormalizationOutcome::Fallback`] and callers use
//! the original tile for every output.

use image::{Rgb, RgbImage};
use nalgebra::{Matrix3x2, SymmetricEigen, Vector2, Vector3};
use tracing::{debug, warn};

use crate::error::StainError;

use super::optical_density::{
    covariance, is_tissue, optical_density, percentile_of_sorted, sort_samples,
};

/// Default incident light intensity.
pub const DEFAULT_IO: f64 = 240.0;

/// Default percentile cutoff for the robust angle bounds.
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Default OD threshold below which a pixel counts as background.
pub const DEFAULT_BETA: f64 = 0.15;

/// Minimum number of tissue samples needed to fit stain vectors.
pub const MIN_TISSUE_PIXELS: usize = 100;

/// Largest value written to any output channel.
///
/// Rendered values above it are clamped to it rather than to 255.
pub const MAX_OUTPUT_VALUE: u8 = 254;

/// Percentile used as the per-stain maximum concentration.
const CONCENTRATION_PERCENTILE: f64 = 99.0;

const EIGEN_MAX_ITERATIONS: usize = 1000;

/// Below this determinant of `HEᵀHE` the two stain directions coincide.
const MIN_STAIN_GRAM_DETERMINANT: f64 = 1e-10;

// =============================================================================
// Parameters
// =============================================================================

/// Tunable parameters of the Macenko fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerParams {
    /// Incident light intensity (`Io`)
    pub io: f64,

    /// Percentile (0..50) cutting off angle outliers
    pub alpha: f64,

    /// OD threshold separating tissue from background
    pub beta: f64,
}

impl Default for NormalizerParams {
    fn default() -> Self {
        Self {
            io: DEFAULT_IO,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
        }
    }
}

/// Reference stain vectors and maximum concentrations every tile is
/// normalized to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StainReference {
    /// 3×2 OD matrix, columns are hematoxylin and eosin
    pub stain_matrix: Matrix3x2<f64>,

    /// Reference maximum concentration of hematoxylin and eosin
    pub max_concentrations: Vector2<f64>,
}

impl StainReference {
    pub fn new(stain_matrix: Matrix3x2<f64>, max_concentrations: Vector2<f64>) -> Self {
        Self {
            stain_matrix,
            max_concentrations,
        }
    }

    fn hematoxylin(&self) -> Vector3<f64> {
        self.stain_matrix.column(0).into_owned()
    }

    fn eosin(&self) -> Vector3<f64> {
        self.stain_matrix.column(1).into_owned()
    }
}

impl Default for StainReference {
    fn default() -> Self {
        Self::new(
            Matrix3x2::new(0.5626, 0.2159, 0.7201, 0.8012, 0.4062, 0.5581),
            Vector2::new(1.9705, 1.0308),
        )
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// The three rasters produced for a successfully separated tile.
#[derive(Debug, Clone, PartialEq)]
pub struct StainChannels {
    /// Tile re-rendered with the reference stain matrix
    pub normalized: RgbImage,

    /// Hematoxylin contribution only
    pub hematoxylin: RgbImage,

    /// Eosin contribution only
    pub eosin: RgbImage,
}

/// Result of normalizing one tile.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationOutcome {
    /// Stain separation succeeded
    Separated(StainChannels),

    /// Tile carries no usable stain signal; use the original tile unchanged
    Fallback(StainError),
}

impl NormalizationOutcome {
    /// Whether stain separation succeeded.
    pub fn is_separated(&self) -> bool {
        matches!(self, Self::Separated(_))
    }

    /// The separated channels, if any.
    pub fn channels(&self) -> Option<&StainChannels> {
        match self {
            Self::Separated(channels) => Some(channels),
            Self::Fallback(_) => None,
        }
    }

    /// Resolve into `(normalized, hematoxylin, eosin, succeeded)`.
    ///
    /// A fallback yields three copies of `original` and `false`.
    pub fn into_rasters(self, original: &RgbImage) -> (RgbImage, RgbImage, RgbImage, bool) {
        match self {
            Self::Separated(c) => (c.normalized, c.hematoxylin, c.eosin, true),
            Self::Fallback(_) => (original.clone(), original.clone(), original.clone(), false),
        }
    }
}

// =============================================================================
// Normalizer
// =============================================================================

/// Macenko stain normalizer.
///
/// Stateless apart from its parameters; one instance can normalize any
/// number of tiles.
///
/// # Example
///
/// ```
/// use hne_normalizer::stain::{NormalizerParams, StainNormalizer, StainReference};
/// use image::{Rgb, RgbImage};
///
/// let normalizer = StainNormalizer::new(NormalizerParams::default(), StainReference::default());
/// let blank = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
///
/// let outcome = normalizer.normalize(&blank);
/// assert!(!outcome.is_separated());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StainNormalizer {
    params: NormalizerParams,
    reference: StainReference,
}

impl StainNormalizer {
    pub fn new(params: NormalizerParams, reference: StainReference) -> Self {
        Self { params, reference }
    }

    pub fn params(&self) -> &NormalizerParams {
        &self.params
    }

    pub fn reference(&self) -> &StainReference {
        &self.reference
    }

    /// Normalize one tile and separate its stains.
    ///
    /// Never fails: tiles that cannot be separated produce
    /// [`NormalizationOutcome::Fallback`].
    pub fn normalize(&self, tile: &RgbImage) -> NormalizationOutcome {
        match self.separate(tile) {
            Ok(channels) => NormalizationOutcome::Separated(channels),
            Err(reason) => {
                warn!("Skipping stain separation: {}", reason);
                NormalizationOutcome::Fallback(reason)
            }
        }
    }

    fn separate(&self, tile: &RgbImage) -> Result<StainChannels, StainError> {
        let od: Vec<Vector3<f64>> = tile
            .pixels()
            .map(|p| optical_density(p.0, self.params.io))
            .collect();

        let tissue: Vec<Vector3<f64>> = od
            .iter()
            .filter(|v| is_tissue(v, self.params.beta))
            .copied()
            .collect();

        if tissue.len() < MIN_TISSUE_PIXELS {
            return Err(StainError::InsufficientTissue {
                found: tissue.len(),
                required: MIN_TISSUE_PIXELS,
            });
        }

        let stains = self.estimate_stain_matrix(&tissue)?;
        debug!(
            "Stain vectors: H = ({:.4}, {:.4}, {:.4}), E = ({:.4}, {:.4}, {:.4})",
            stains[(0, 0)],
            stains[(1, 0)],
            stains[(2, 0)],
            stains[(0, 1)],
            stains[(1, 1)],
            stains[(2, 1)]
        );

        let mut concentrations = solve_concentrations(&stains, &od)?;
        let scale = self.concentration_scale(&concentrations)?;
        for c in concentrations.iter_mut() {
            *c = c.component_mul(&scale);
        }

        Ok(self.render(tile.width(), tile.height(), &concentrations))
    }

    /// Fit the 3×2 stain matrix (hematoxylin, eosin) from tissue samples.
    fn estimate_stain_matrix(&self, tissue: &[Vector3<f64>]) -> Result<Matrix3x2<f64>, StainError> {
        let cov = covariance(tissue);
        if cov.iter().any(|v| !v.is_finite()) {
            return Err(StainError::DegenerateStatistics(
                "covariance is not finite".to_string(),
            ));
        }

        let eigen = SymmetricEigen::try_new(cov, f64::EPSILON, EIGEN_MAX_ITERATIONS).ok_or_else(
            || StainError::DegenerateStatistics("eigendecomposition did not converge".to_string()),
        )?;

        // Ascending eigenvalue order; the last two span the stain plane.
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
        let second: Vector3<f64> = eigen.eigenvectors.column(order[1]).into_owned();
        let largest: Vector3<f64> = eigen.eigenvectors.column(order[2]).into_owned();

        let mut angles: Vec<f64> = tissue
            .iter()
            .map(|od| od.dot(&largest).atan2(od.dot(&second)))
            .collect();
        sort_samples(&mut angles);

        let min_phi = percentile_of_sorted(&angles, self.params.alpha);
        let max_phi = percentile_of_sorted(&angles, 100.0 - self.params.alpha);

        let v_min = second * min_phi.cos() + largest * min_phi.sin();
        let v_max = second * max_phi.cos() + largest * max_phi.sin();

        let (hematoxylin, eosin) = if v_min[0] > v_max[0] {
            (v_min, v_max)
        } else {
            (v_max, v_min)
        };

        Ok(Matrix3x2::from_columns(&[hematoxylin, eosin]))
    }

    /// Per-stain factor mapping the 99th percentile concentration onto the
    /// reference maximum.
    fn concentration_scale(&self, concentrations: &[Vector2<f64>]) -> Result<Vector2<f64>, StainError> {
        let mut scale = Vector2::zeros();

        for stain in 0..2 {
            let mut values: Vec<f64> = concentrations.iter().map(|c| c[stain]).collect();
            sort_samples(&mut values);
            let max_c = percentile_of_sorted(&values, CONCENTRATION_PERCENTILE);

            if !max_c.is_finite() || max_c <= 0.0 {
                return Err(StainError::DegenerateStatistics(format!(
                    "non-positive maximum concentration {} for stain {}",
                    max_c, stain
                )));
            }
            scale[stain] = self.reference.max_concentrations[stain] / max_c;
        }

        Ok(scale)
    }

    fn render(&self, width: u32, height: u32, concentrations: &[Vector2<f64>]) -> StainChannels {
        let io = self.params.io;
        let reference = self.reference.stain_matrix;
        let h_ref = self.reference.hematoxylin();
        let e_ref = self.reference.eosin();
        let at = |x: u32, y: u32| concentrations[(y as usize) * (width as usize) + x as usize];

        StainChannels {
            normalized: RgbImage::from_fn(width, height, |x, y| {
                to_pixel(io, &(reference * at(x, y)))
            }),
            hematoxylin: RgbImage::from_fn(width, height, |x, y| {
                to_pixel(io, &(h_ref * at(x, y)[0]))
            }),
            eosin: RgbImage::from_fn(width, height, |x, y| {
                to_pixel(io, &(e_ref * at(x, y)[1]))
            }),
        }
    }
}

/// Least-squares concentrations of every pixel against a 3×2 stain matrix.
fn solve_concentrations(
    stains: &Matrix3x2<f64>,
    od: &[Vector3<f64>],
) -> Result<Vec<Vector2<f64>>, StainError> {
    let gram = stains.transpose() * stains;
    if gram.determinant().abs() < MIN_STAIN_GRAM_DETERMINANT {
        return Err(StainError::DegenerateStatistics(
            "stain directions are collinear".to_string(),
        ));
    }
    let gram_inv = gram.try_inverse().ok_or_else(|| {
        StainError::DegenerateStatistics("stain matrix is singular".to_string())
    })?;
    let pseudo_inverse = gram_inv * stains.transpose();

    Ok(od.iter().map(|v| pseudo_inverse * v).collect())
}

fn to_pixel(io: f64, od: &Vector3<f64>) -> Rgb<u8> {
    Rgb([
        render_value(io, od[0]),
        render_value(io, od[1]),
        render_value(io, od[2]),
    ])
}

/// Beer-Lambert rendering of one channel, `io * exp(-od)`.
#[inline]
fn render_value(io: f64, od: f64) -> u8 {
    let value = io * (-od).exp();
    if value > f64::from(MAX_OUTPUT_VALUE) {
        MAX_OUTPUT_VALUE
    } else {
        // Truncates; NaN and negatives saturate to 0
        value as u8
    }
}

// =============================================================================
// Tests
// =============================================================================
