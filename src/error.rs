//! Error type for loading, normalizing and summarizing attendance uploads.
//!
//! Errors serialize as `{code, message}` so a front end can show them
//! without matching on variants.

use serde::ser::SerializeStruct;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttendanceError {
    /// The payload could not be decoded into a table.
    #[error("Could not read attendance data: {0}")]
    Parse(String),

    /// One or more identity columns are absent after header cleanup.
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Aggregation was handed a table without its grouping columns.
    #[error("Cannot summarize table: {0}")]
    Aggregation(String),

    #[error("Unsupported file type '{0}' (expected .csv, .xlsx, .xlsm, .xlsb, .xls or .ods)")]
    UnsupportedFormat(String),

    #[error("File has more than {limit} rows")]
    TooManyRows { limit: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AttendanceError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "PARSE_ERROR",
            Self::MissingColumns(_) => "MISSING_COLUMNS",
            Self::Aggregation(_) => "AGGREGATION_ERROR",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::TooManyRows { .. } => "TOO_MANY_ROWS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Names of the missing identity columns, if that is what went wrong.
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            Self::MissingColumns(cols) => Some(cols),
            _ => None,
        }
    }

    /// Whether re-uploading a corrected file can fix this.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::MissingColumns(_) | Self::UnsupportedFormat(_) | Self::TooManyRows { .. }
        )
    }
}

impl Serialize for AttendanceError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AttendanceError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
