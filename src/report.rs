//! Summary report of a processing run.
//!
//! The text form is the four-line human readable summary:
//!
//! ```text
//! TOTAL SLIDE ANALYSIS (1,048,576 pixels):
//!   Purple: 12.3% (129,024 pixels)
//!   Pink: 40.0% (419,430 pixels)
//!   Background: 47.7% (500,122 pixels)
//! ```
//!
//! The JSON form carries the same numbers plus tile statistics.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::ProcessError;
use crate::stain::PixelCounts;
use crate::tile::ProcessingSummary;

/// Output format of the summary report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Four-line plain text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Pixel count and share of the total for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassShare {
    pub pixels: u64,
    pub percent: f64,
}

/// Aggregate report of a processing run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub total_pixels: u64,
    pub purple: ClassShare,
    pub pink: ClassShare,
    pub background: ClassShare,
    pub tiles_processed: usize,
    pub tiles_fallback: usize,
    pub tiles_failed: usize,
}

impl SummaryReport {
    pub fn from_summary(summary: &ProcessingSummary) -> Self {
        let counts: &PixelCounts = &summary.counts;
        Self {
            total_pixels: counts.total,
            purple: ClassShare {
                pixels: counts.purple,
                percent: counts.purple_percent(),
            },
            pink: ClassShare {
                pixels: counts.pink,
                percent: counts.pink_percent(),
            },
            background: ClassShare {
                pixels: counts.background,
                percent: counts.background_percent(),
            },
            tiles_processed: summary.tiles_processed,
            tiles_fallback: summary.tiles_fallback,
            tiles_failed: summary.failed_tiles.len(),
        }
    }

    pub fn to_text(&self) -> String {
        format!(
            "TOTAL SLIDE ANALYSIS ({} pixels):\n  \
             Purple: {:.1}% ({} pixels)\n  \
             Pink: {:.1}% ({} pixels)\n  \
             Background: {:.1}% ({} pixels)\n",
            group_thousands(self.total_pixels),
            self.purple.percent,
            group_thousands(self.purple.pixels),
            self.pink.percent,
            group_thousands(self.pink.pixels),
            self.background.percent,
            group_thousands(self.background.pixels),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render the report in `format`.
    pub fn render(&self, format: ReportFormat) -> Result<String, serde_json::Error> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => self.to_json(),
        }
    }

    /// Write the report to `path` in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Write`] if the report cannot be serialized or
    /// the file cannot be written. Nothing is written when serialization
    /// fails.
    pub fn write(&self, path: impl AsRef<Path>, format: ReportFormat) -> Result<(), ProcessError> {
        let path = path.as_ref();
        let write_error = |message: String| ProcessError::Write {
            path: path.to_path_buf(),
            message,
        };

        let contents = self
            .render(format)
            .map_err(|e| write_error(e.to_string()))?;
        fs::write(path, contents).map_err(|e| write_error(e.to_string()))
    }
}

/// Format an integer with comma thousands separators.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
