//! One upload, start to finish: load, normalize, aggregate.
//!
//! Nothing is shared between runs; every call rebuilds all tables.

use crate::aggregator::aggregate;
use crate::config::ReportConfig;
use crate::error::{AttendanceError, Result};
use crate::loader::{load_bytes, load_path};
use crate::normalizer::normalize;
use crate::types::{AttendanceReport, RawTable};
use std::path::Path;
use tracing::info;

pub fn run_path(path: &Path, config: &ReportConfig) -> Result<AttendanceReport> {
    config.validate()?;
    let raw = load_path(path, config)?;
    build_report(path.display().to_string(), &raw, config)
}

pub fn run_bytes(file_name: &str, bytes: &[u8], config: &ReportConfig) -> Result<AttendanceReport> {
    config.validate()?;
    let raw = load_bytes(file_name, bytes, config)?;
    build_report(file_name.to_string(), &raw, config)
}

fn build_report(source: String, raw: &RawTable, config: &ReportConfig) -> Result<AttendanceReport> {
    let table = normalize(raw, config)?;
    let (summary, pivot) = aggregate(&table)?;
    info!(
        "Summarized {} records into {} class/gender groups",
        table.records.len(),
        summary.rows.len()
    );
    let preview = table
        .records
        .iter()
        .take(config.preview_rows)
        .cloned()
        .collect();
    Ok(AttendanceReport {
        source,
        generated_at: chrono::Utc::now(),
        normalize: table.report,
        preview,
        summary,
        pivot,
    })
}

/// The one message shown to the user when a run fails.
pub fn user_message(err: &AttendanceError) -> String {
    match err {
        AttendanceError::MissingColumns(cols) => format!(
            "The file is missing required column(s): {}. Check the header row and upload again.",
            cols.join(", ")
        ),
        e if e.is_input_error() => format!("Could not process the file: {}", e),
        e => format!("Something went wrong: {}", e),
    }
}
