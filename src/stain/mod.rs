//! Stain separation and pixel classification.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │  RGB tile    │───▶│ StainNormalizer  │───▶│ PixelClassifier  │───▶ PixelCounts
//! └──────────────┘    │ (Macenko fit)    │    │ (threshold masks)│
//!                     └────────┬─────────┘    └──────────────────┘
//!                              │
//!                              ▼
//!                normalized / H / E rasters, or Fallback
//! ```
//!
//! - [`StainNormalizer`]: per-tile Macenko stain separation and normalization
//! - [`PixelClassifier`]: nuclei / cytoplasm / background pixel counts
//! - [`StainReference`]: reference stain matrix and maximum concentrations

mod classifier;
mod normalizer;
mod optical_density;

pub use classifier::{PixelClassifier, PixelCounts, DEFAULT_CLASSIFICATION_THRESHOLD};
pub use normalizer::{
    NormalizationOutcome, NormalizerParams, StainChannels, StainNormalizer, StainReference,
    DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_IO, MAX_OUTPUT_VALUE, MIN_TISSUE_PIXELS,
};
pub use optical_density::optical_density;
