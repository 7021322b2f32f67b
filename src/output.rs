use crate::error::Result;
use crate::types::{
    AttendanceReport, NormalizedRecord, PivotTable, SummaryRow, ABSENCE_COLUMNS, CLASS,
    IDENTITY_COLUMNS, PRESENT,
};
use crate::util::{format_count, plain_count};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::info;

pub const SUMMARY_FILE: &str = "summary.csv";
pub const PIVOT_FILE: &str = "pivot.csv";
pub const REPORT_FILE: &str = "report.json";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Pivot as CSV with single-level headers such as `Total_Absent_Male`.
pub fn write_pivot_csv(path: &Path, pivot: &PivotTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec![CLASS.to_string()];
    header.extend(pivot.columns.iter().map(|c| c.flat_name()));
    wtr.write_record(&header)?;
    for row in &pivot.rows {
        let mut record = vec![row.class.clone()];
        record.extend(row.values.iter().map(|v| plain_count(*v)));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub summary: PathBuf,
    pub pivot: PathBuf,
    pub report: PathBuf,
}

/// Write summary, pivot and the full JSON report into `dir`.
pub fn export(report: &AttendanceReport, dir: &Path) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir)?;
    let paths = ExportPaths {
        summary: dir.join(SUMMARY_FILE),
        pivot: dir.join(PIVOT_FILE),
        report: dir.join(REPORT_FILE),
    };
    write_csv(&paths.summary, &report.summary.rows)?;
    write_pivot_csv(&paths.pivot, &report.pivot)?;
    write_json(&paths.report, report)?;
    info!("Exported report to {}", dir.display());
    Ok(paths)
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn render_summary(rows: &[SummaryRow]) -> String {
    preview_table_rows(rows, rows.len())
}

/// Identity columns followed by every schema column.
pub fn render_preview(records: &[NormalizedRecord]) -> String {
    if records.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    let mut header: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.push(PRESENT.to_string());
    header.extend(ABSENCE_COLUMNS.iter().map(|c| c.to_string()));
    builder.push_record(header);
    for r in records {
        let mut row = vec![r.student_name.clone(), r.class.clone(), r.gender.clone()];
        row.push(format_count(r.present));
        row.extend(r.absences.iter().map(|v| format_count(*v)));
        builder.push_record(row);
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Two header rows: metric names, then genders beneath them.
pub fn render_pivot(pivot: &PivotTable) -> String {
    if pivot.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    let mut metrics = vec![String::new()];
    let mut genders = vec![CLASS.to_string()];
    let mut last_metric = None;
    for col in &pivot.columns {
        if last_metric == Some(col.metric) {
            metrics.push(String::new());
        } else {
            metrics.push(col.metric.label().to_string());
            last_metric = Some(col.metric);
        }
        genders.push(col.gender.clone());
    }
    builder.push_record(metrics);
    builder.push_record(genders);
    for row in &pivot.rows {
        let mut record = vec![row.class.clone()];
        record.extend(row.values.iter().map(|v| format_count(*v)));
        builder.push_record(record);
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Full console rendering of one upload.
pub fn render_report(report: &AttendanceReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "File processed: {} ({} rows, header at row {})\n\n",
        report.source,
        crate::util::format_int(report.normalize.data_rows),
        report.normalize.header_row + 1
    ));
    if !report.normalize.synthesized_columns.is_empty() {
        out.push_str(&format!(
            "Info: columns not in file, counted as 0: {}\n\n",
            report.normalize.synthesized_columns.join(", ")
        ));
    }
    if report.normalize.coerced_cells > 0 {
        out.push_str(&format!(
            "Note: {} non-numeric attendance values counted as 0.\n\n",
            crate::util::format_int(report.normalize.coerced_cells)
        ));
    }
    if report.normalize.dropped_rows > 0 {
        out.push_str(&format!(
            "Note: {} incomplete rows dropped.\n\n",
            crate::util::format_int(report.normalize.dropped_rows)
        ));
    }
    out.push_str("Preview of Cleaned Data\n\n");
    out.push_str(&render_preview(&report.preview));
    out.push_str("\n\nClass-wise Summary (Class x Gender)\n\n");
    out.push_str(&render_summary(&report.summary.rows));
    out.push_str("\n\nPivot Summary (Class x Gender)\n\n");
    out.push_str(&render_pivot(&report.pivot));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::pivot;
    use crate::types::SummaryTable;

    fn summary() -> SummaryTable {
        SummaryTable {
            rows: vec![
                SummaryRow {
                    class: "5".into(),
                    gender: "Female".into(),
                    total_students: 1,
                    total_present: 1.0,
                    total_absent: 0.0,
                },
                SummaryRow {
                    class: "6".into(),
                    gender: "Male".into(),
                    total_students: 2,
                    total_present: 1.5,
                    total_absent: 0.5,
                },
            ],
            ungrouped_rows: 0,
        }
    }

    #[test]
    fn summary_table_has_expected_headers() {
        let out = render_summary(&summary().rows);
        assert!(out.contains("Total_Students"));
        assert!(out.contains("Total_Absent"));
        assert!(out.contains("1.50"));
    }

    #[test]
    fn pivot_table_has_two_header_rows() {
        let out = render_pivot(&pivot(&summary()));
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("Total_Students"));
        assert!(lines[0].contains("Total_Present"));
        assert!(lines.iter().any(|l| l.contains("Class") && l.contains("Female")));
    }

    #[test]
    fn empty_tables_render_placeholder() {
        assert_eq!(render_summary(&[]), "(no rows)");
        assert_eq!(render_pivot(&PivotTable::default()), "(no rows)");
        assert_eq!(render_preview(&[]), "(no rows)");
    }

    #[test]
    fn summary_csv_writes_whole_counts_as_integers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUMMARY_FILE);
        write_csv(&path, &summary().rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Class,Gender,Total_Students,Total_Present,Total_Absent")
        );
        assert_eq!(lines.next(), Some("5,Female,1,1,0"));
        assert_eq!(lines.next(), Some("6,Male,2,1.5,0.5"));
    }

    #[test]
    fn pivot_csv_flattens_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PIVOT_FILE);
        write_pivot_csv(&path, &pivot(&summary())).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Class,Total_Students_Female,Total_Students_Male,Total_Present_Female,Total_Present_Male,Total_Absent_Female,Total_Absent_Male")
        );
        assert_eq!(lines.next(), Some("5,1,0,1,0,0,0"));
        assert_eq!(lines.next(), Some("6,0,2,0,1.50,0,0.50"));
    }
}
