//! Run configuration for one upload.
//!
//! Use [`ReportConfig::builder()`] for a fluent setup:
//!
//! ```rust
//! use attendance_report::{HeaderSkip, ReportConfig, Strictness};
//!
//! let config = ReportConfig::builder()
//!     .header_skip(HeaderSkip::Fixed(5))
//!     .strictness(Strictness::Strict)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.preview_rows, 5);
//! ```

use crate::error::{AttendanceError, Result};
use serde::{Deserialize, Serialize};

/// How many rows at the top of the sheet are banner text rather than data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderSkip {
    /// Discard exactly this many rows; the next row is the header.
    Fixed(usize),
    /// Use the first row that names every identity column.
    Auto,
}

impl Default for HeaderSkip {
    fn default() -> Self {
        HeaderSkip::Fixed(0)
    }
}

/// What to do with rows that lack a student name, class or gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Strictness {
    /// Keep them; they are left out of grouping only.
    #[default]
    Lenient,
    /// Drop them during normalization.
    Strict,
}

pub const DEFAULT_MAX_ROWS: usize = 100_000;
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Leading rows scanned by [`HeaderSkip::Auto`].
pub const AUTO_HEADER_SCAN_ROWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default: `Fixed(0)`
    pub header_skip: HeaderSkip,
    /// Default: Lenient
    pub strictness: Strictness,
    /// Uploads with more raw rows than this are rejected.
    /// Default: 100 000
    pub max_rows: usize,
    /// Normalized rows kept for the preview.
    /// Default: 5
    pub preview_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            header_skip: HeaderSkip::default(),
            strictness: Strictness::default(),
            max_rows: DEFAULT_MAX_ROWS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl ReportConfig {
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rows == 0 {
            return Err(AttendanceError::InvalidConfig(
                "max_rows must be greater than 0".to_string(),
            ));
        }
        if let HeaderSkip::Fixed(n) = self.header_skip {
            if n >= self.max_rows {
                return Err(AttendanceError::InvalidConfig(format!(
                    "header skip {} leaves no room under max_rows {}",
                    n, self.max_rows
                )));
            }
        }
        Ok(())
    }

    pub fn is_strict(&self) -> bool {
        self.strictness == Strictness::Strict
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportConfigBuilder {
    config: ReportConfig,
}

impl ReportConfigBuilder {
    pub fn header_skip(mut self, skip: HeaderSkip) -> Self {
        self.config.header_skip = skip;
        self
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.config.strictness = strictness;
        self
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.config.max_rows = max_rows;
        self
    }

    pub fn preview_rows(mut self, preview_rows: usize) -> Self {
        self.config.preview_rows = preview_rows;
        self
    }

    pub fn build(self) -> Result<ReportConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
