//! Class-wise attendance summaries from spreadsheet uploads.
//!
//! An upload flows one way through the crate:
//!
//! - [`loader`] reads a `.csv` or spreadsheet file into a raw cell grid,
//! - [`normalizer`] finds the header, trims names, fills absent attendance
//!   columns with 0 and coerces counts,
//! - [`aggregator`] sums presence and absence per (Class, Gender) and pivots
//!   genders into columns,
//! - [`output`] renders or exports the result.
//!
//! [`pipeline::run_path`] runs all of it for one file:
//!
//! ```rust,ignore
//! use attendance_report::{pipeline, ReportConfig};
//!
//! let report = pipeline::run_path("week3.xlsx".as_ref(), &ReportConfig::default())?;
//! println!("{}", attendance_report::output::render_report(&report));
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod loader;
pub mod normalizer;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod util;

pub use aggregator::{aggregate, derive};
pub use config::{HeaderSkip, ReportConfig, Strictness};
pub use error::{AttendanceError, Result};
pub use normalizer::normalize;
pub use types::{
    AttendanceReport, Metric, NormalizedRecord, NormalizedTable, PivotTable, RawTable, SummaryRow,
    SummaryTable, ABSENCE_COLUMNS,
};
