use crate::config::ReportConfig;
use crate::error::{AttendanceError, Result};
use crate::types::RawTable;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use csv::{ReaderBuilder, StringRecord};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    /// Picks the decoder from the file extension, ignoring case.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceFormat::Spreadsheet),
            _ => Err(AttendanceError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// Read an attendance file from disk into a raw cell grid.
pub fn load_path(path: &Path, config: &ReportConfig) -> Result<RawTable> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let format = SourceFormat::from_file_name(name)?;
    info!("Loading {} ({:?})", path.display(), format);
    let table = match format {
        SourceFormat::Csv => read_csv(&std::fs::read(path)?, config.max_rows)?,
        SourceFormat::Spreadsheet => {
            let workbook = open_workbook_auto(path)
                .map_err(|e| AttendanceError::Parse(format!("{}: {}", path.display(), e)))?;
            read_first_sheet(workbook, config.max_rows)?
        }
    };
    debug!("Read {} raw rows", table.len());
    Ok(table)
}

/// Decode an in-memory upload. `file_name` only selects the format.
pub fn load_bytes(file_name: &str, bytes: &[u8], config: &ReportConfig) -> Result<RawTable> {
    let format = SourceFormat::from_file_name(file_name)?;
    info!("Decoding upload {} ({} bytes, {:?})", file_name, bytes.len(), format);
    match format {
        SourceFormat::Csv => read_csv(bytes, config.max_rows),
        SourceFormat::Spreadsheet => {
            let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
                .map_err(|e| AttendanceError::Parse(format!("{}: {}", file_name, e)))?;
            read_first_sheet(workbook, config.max_rows)
        }
    }
}

/// Every record becomes one row; the header is identified later. Empty lines
/// are kept as empty rows so a fixed header skip counts physical lines, the
/// same as sheet rows.
fn read_csv(bytes: &[u8], max_rows: usize) -> Result<RawTable> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut record = StringRecord::new();
    let mut offset = 0usize;
    loop {
        // The csv reader skips empty lines without reporting them.
        for _ in 0..count_empty_lines(bytes, offset) {
            push_row(&mut rows, Vec::new(), max_rows)?;
        }
        let more = rdr
            .read_record(&mut record)
            .map_err(|e| AttendanceError::Parse(e.to_string()))?;
        if !more {
            break;
        }
        push_row(&mut rows, record.iter().map(str::to_string).collect(), max_rows)?;
        offset = rdr.position().byte() as usize;
    }
    if rows.iter().all(|r| r.is_empty()) {
        return Err(AttendanceError::Parse("file contains no rows".to_string()));
    }
    Ok(RawTable::new(rows))
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>, max_rows: usize) -> Result<()> {
    if rows.len() == max_rows {
        return Err(AttendanceError::TooManyRows { limit: max_rows });
    }
    rows.push(row);
    Ok(())
}

/// Consecutive empty lines starting at `pos`. A `\n` left over from a `\r\n`
/// record terminator is not a line of its own.
fn count_empty_lines(bytes: &[u8], mut pos: usize) -> usize {
    if pos > 0 && bytes.get(pos) == Some(&b'\n') && bytes.get(pos - 1) == Some(&b'\r') {
        pos += 1;
    }
    let mut count = 0;
    loop {
        match bytes.get(pos..) {
            Some([b'\r', b'\n', ..]) => pos += 2,
            Some([b'\n', ..]) | Some([b'\r', ..]) => pos += 1,
            _ => return count,
        }
        count += 1;
    }
}

/// Only the first worksheet is read. Rows above the used range are kept as
/// empty rows so a fixed header skip counts sheet rows.
fn read_first_sheet<RS: Read + Seek>(mut workbook: Sheets<RS>, max_rows: usize) -> Result<RawTable> {
    let sheet_names = workbook.sheet_names();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(AttendanceError::Parse("workbook has no sheets".to_string()));
    };
    debug!("Reading sheet '{}' (first of {})", sheet_name, sheet_names.len());
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| AttendanceError::Parse(format!("sheet '{}': {}", sheet_name, e)))?;

    let leading = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let offset_cols = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    let (height, _) = range.get_size();
    if leading + height > max_rows {
        return Err(AttendanceError::TooManyRows { limit: max_rows });
    }

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); leading];
    for row in range.rows() {
        let mut cells = vec![String::new(); offset_cols];
        cells.extend(row.iter().map(cell_to_string));
        rows.push(cells);
    }
    if rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty())) {
        return Err(AttendanceError::Parse(format!("sheet '{}' is empty", sheet_name)));
    }
    Ok(RawTable::new(rows))
}

/// Render a spreadsheet cell the way it would appear in a CSV export.
pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Bool(true) => "1".to_string(),
        Data::Bool(false) => "0".to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if crate::util::is_integral(*f) => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}
