//! Turns a raw cell grid into attendance records.
//!
//! Missing schema columns and unparseable counts become 0. Only a missing
//! identity column or a missing header row is an error.

use crate::config::{HeaderSkip, ReportConfig, AUTO_HEADER_SCAN_ROWS};
use crate::error::{AttendanceError, Result};
use crate::types::{
    NormalizeReport, NormalizedRecord, NormalizedTable, RawTable, ABSENCE_COLUMNS, CLASS, GENDER,
    IDENTITY_COLUMNS, PRESENT, STUDENT_NAME,
};
use crate::util::{capitalize, parse_count};
use std::collections::HashMap;
use tracing::{debug, warn};

pub fn normalize(raw: &RawTable, config: &ReportConfig) -> Result<NormalizedTable> {
    let header_row = locate_header(raw, config.header_skip)?;
    let headers: Vec<String> = raw.rows[header_row]
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    debug!("Header row {}: {:?}", header_row, headers);

    let missing = missing_identity_columns(&headers);
    if !missing.is_empty() {
        return Err(AttendanceError::MissingColumns(missing));
    }

    // First occurrence wins when a header repeats.
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        index.entry(h.as_str()).or_insert(i);
    }

    let synthesized_columns: Vec<String> = crate::types::schema_columns()
        .filter(|c| !index.contains_key(c))
        .map(str::to_string)
        .collect();
    if !synthesized_columns.is_empty() {
        debug!("Filling absent columns with 0: {}", synthesized_columns.join(", "));
    }

    let name_idx = index[STUDENT_NAME];
    let class_idx = index[CLASS];
    let gender_idx = index[GENDER];
    let present_idx = index.get(PRESENT).copied();
    let absence_idx: Vec<Option<usize>> = ABSENCE_COLUMNS
        .iter()
        .map(|c| index.get(c).copied())
        .collect();

    let mut report = NormalizeReport {
        header_row,
        synthesized_columns: synthesized_columns.clone(),
        ..Default::default()
    };
    let mut records = Vec::new();

    for row in &raw.rows[header_row + 1..] {
        if row.iter().all(|c| c.trim().is_empty()) {
            report.blank_rows += 1;
            continue;
        }
        report.data_rows += 1;

        let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");
        let student_name = cell(name_idx).trim().to_string();
        let class = cell(class_idx).trim().to_string();
        let gender = capitalize(cell(gender_idx).trim());

        if config.is_strict() && (student_name.is_empty() || class.is_empty() || gender.is_empty()) {
            report.dropped_rows += 1;
            continue;
        }

        let mut count = |idx: Option<usize>| -> f64 {
            let Some(idx) = idx else { return 0.0 };
            let value = cell(idx);
            match parse_count(value) {
                Some(v) => v,
                None => {
                    if !value.trim().is_empty() {
                        report.coerced_cells += 1;
                    }
                    0.0
                }
            }
        };

        let present = count(present_idx);
        let mut absences = [0.0; ABSENCE_COLUMNS.len()];
        for (slot, idx) in absences.iter_mut().zip(absence_idx.iter()) {
            *slot = count(*idx);
        }

        records.push(NormalizedRecord {
            student_name,
            class,
            gender,
            present,
            absences,
        });
    }

    if report.coerced_cells > 0 {
        debug!("{} attendance cells were not numbers and count as 0", report.coerced_cells);
    }
    if report.dropped_rows > 0 {
        warn!("Dropped {} rows without a student name, class or gender", report.dropped_rows);
    }

    let mut columns = headers;
    columns.extend(synthesized_columns);
    Ok(NormalizedTable {
        columns,
        records,
        report,
    })
}

/// Identity columns absent from a trimmed header row, in schema order.
pub fn missing_identity_columns(headers: &[String]) -> Vec<String> {
    IDENTITY_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .map(|c| c.to_string())
        .collect()
}

fn locate_header(raw: &RawTable, skip: HeaderSkip) -> Result<usize> {
    match skip {
        HeaderSkip::Fixed(n) => {
            if n >= raw.len() {
                return Err(AttendanceError::Parse(format!(
                    "no header row after skipping {} of {} rows",
                    n,
                    raw.len()
                )));
            }
            Ok(n)
        }
        HeaderSkip::Auto => {
            let scanned = raw.rows.iter().take(AUTO_HEADER_SCAN_ROWS);
            for (i, row) in scanned.enumerate() {
                let trimmed: Vec<String> = row.iter().map(|c| c.trim().to_string()).collect();
                if missing_identity_columns(&trimmed).is_empty() {
                    debug!("Detected header at row {}", i);
                    return Ok(i);
                }
            }
            // Report against the first non-blank row, the most likely header.
            let first = raw
                .rows
                .iter()
                .find(|r| r.iter().any(|c| !c.trim().is_empty()))
                .ok_or_else(|| AttendanceError::Parse("file contains no rows".to_string()))?;
            let trimmed: Vec<String> = first.iter().map(|c| c.trim().to_string()).collect();
            Err(AttendanceError::MissingColumns(missing_identity_columns(&trimmed)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strictness;
    use pretty_assertions::assert_eq;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn headers_are_trimmed_and_schema_completed() {
        let raw = table(&[
            &[" Student Name ", "Class", " Gender", "Present ", "Leave"],
            &["Asha", "5", "female", "1", "0"],
        ]);
        let out = normalize(&raw, &ReportConfig::default()).unwrap();
        assert_eq!(&out.columns[..5], &["Student Name", "Class", "Gender", "Present", "Leave"]);
        for col in ABSENCE_COLUMNS {
            assert!(out.has_column(col), "missing {}", col);
        }
        assert_eq!(out.report.synthesized_columns.len(), ABSENCE_COLUMNS.len() - 1);
        assert!(!out.report.synthesized_columns.contains(&"Leave".to_string()));
        let rec = &out.records[0];
        assert_eq!(rec.present, 1.0);
        assert!(rec.absences.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn identity_fields_are_trimmed_and_gender_capitalized() {
        let raw = table(&[
            &["Student Name", "Class", "Gender"],
            &["  Asha ", " 5 ", "female"],
            &["Ravi", "5", " MALE "],
            &["Mina", "6", "Male"],
        ]);
        let out = normalize(&raw, &ReportConfig::default()).unwrap();
        let genders: Vec<&str> = out.records.iter().map(|r| r.gender.as_str()).collect();
        assert_eq!(genders, vec!["Female", "Male", "Male"]);
        assert_eq!(out.records[0].student_name, "Asha");
        assert_eq!(out.records[0].class, "5");
    }

    #[test]
    fn non_numeric_cells_become_zero() {
        let raw = table(&[
            &["Student Name", "Class", "Gender", "Present", "Absent", "Village"],
            &["Asha", "5", "F", "yes", "", "-2"],
            &["Ravi", "5", "M", "1", "n/a"],
        ]);
        let out = normalize(&raw, &ReportConfig::default()).unwrap();
        assert_eq!(out.records[0].present, 0.0);
        assert_eq!(out.records[0].absence("Absent"), Some(0.0));
        assert_eq!(out.records[0].absence("Village"), Some(0.0));
        assert_eq!(out.records[1].present, 1.0);
        // Short row: the missing Village cell is a blank, not a coercion.
        assert_eq!(out.report.coerced_cells, 3);
        for rec in &out.records {
            assert!(rec.present.is_finite() && rec.present >= 0.0);
            assert!(rec.absences.iter().all(|v| v.is_finite() && *v >= 0.0));
        }
    }

    #[test]
    fn missing_gender_is_rejected() {
        let raw = table(&[&["Student Name", "Class", "Present"], &["Asha", "5", "1"]]);
        let err = normalize(&raw, &ReportConfig::default()).unwrap_err();
        assert_eq!(err.missing_columns(), Some(&["Gender".to_string()][..]));
    }

    #[test]
    fn header_names_are_case_sensitive() {
        let raw = table(&[&["student name", "Class", "Gender"], &["Asha", "5", "F"]]);
        let err = normalize(&raw, &ReportConfig::default()).unwrap_err();
        assert_eq!(err.missing_columns(), Some(&["Student Name".to_string()][..]));
    }

    #[test]
    fn fixed_skip_discards_banner_rows() {
        let raw = table(&[
            &["School attendance"],
            &["Term 1"],
            &[""],
            &["Generated"],
            &["Week 3"],
            &["Student Name", "Class", "Gender", "Present"],
            &["Asha", "5", "female", "1"],
        ]);
        let config = ReportConfig::builder()
            .header_skip(HeaderSkip::Fixed(5))
            .build()
            .unwrap();
        let out = normalize(&raw, &config).unwrap();
        assert_eq!(out.report.header_row, 5);
        assert_eq!(out.records.len(), 1);

        let err = normalize(&raw, &ReportConfig::default()).unwrap_err();
        assert!(err.missing_columns().is_some());
    }

    #[test]
    fn skip_past_end_is_a_parse_error() {
        let raw = table(&[&["Student Name", "Class", "Gender"]]);
        let config = ReportConfig::builder()
            .header_skip(HeaderSkip::Fixed(1))
            .build()
            .unwrap();
        let err = normalize(&raw, &config).unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn auto_skip_finds_header_row() {
        let raw = table(&[
            &["Attendance for week 3"],
            &["", ""],
            &["Student Name ", "Class", "Gender", "Absent"],
            &["Ravi", "5", "male", "1"],
        ]);
        let config = ReportConfig::builder()
            .header_skip(HeaderSkip::Auto)
            .build()
            .unwrap();
        let out = normalize(&raw, &config).unwrap();
        assert_eq!(out.report.header_row, 2);
        assert_eq!(out.records[0].absence("Absent"), Some(1.0));
    }

    #[test]
    fn auto_skip_without_header_reports_first_row() {
        let raw = table(&[&["Student Name", "Class"], &["Asha", "5"]]);
        let config = ReportConfig::builder()
            .header_skip(HeaderSkip::Auto)
            .build()
            .unwrap();
        let err = normalize(&raw, &config).unwrap_err();
        assert_eq!(err.missing_columns(), Some(&["Gender".to_string()][..]));
    }

    #[test]
    fn strict_mode_drops_incomplete_rows() {
        let raw = table(&[
            &["Student Name", "Class", "Gender", "Present"],
            &["Asha", "5", "female", "1"],
            &["", "5", "male", "1"],
            &["Ravi", " ", "male", "1"],
            &["Mina", "6"],
            &[],
        ]);
        let lenient = normalize(&raw, &ReportConfig::default()).unwrap();
        assert_eq!(lenient.records.len(), 4);
        assert_eq!(lenient.report.blank_rows, 1);

        let config = ReportConfig::builder()
            .strictness(Strictness::Strict)
            .build()
            .unwrap();
        let strict = normalize(&raw, &config).unwrap();
        assert_eq!(strict.records.len(), 1);
        assert_eq!(strict.report.dropped_rows, 3);
    }

    #[test]
    fn input_is_not_mutated() {
        let raw = table(&[&[" Student Name", "Class", "Gender"], &["a", "1", "male"]]);
        let before = raw.clone();
        normalize(&raw, &ReportConfig::default()).unwrap();
        assert_eq!(raw, before);
    }
}
