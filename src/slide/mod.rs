//! Slide access layer.
//!
//! The processing loop reads pixels through the [`TileSource`] trait and never
//! depends on a concrete file format:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            TileProcessor                │
//! └────────────────────┬────────────────────┘
//!                      │ read_region(x, y, 0, w, h)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            TileSource Trait             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//!            ┌───────────────────┐
//!            │  ImageTileSource  │
//!            │ (decoded raster)  │
//!            └───────────────────┘
//! ```

mod source;

pub use source::{ImageTileSource, TileSource, BASE_LEVEL};
