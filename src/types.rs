use crate::util::{display_count, serialize_count, serialize_counts, Count};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use tabled::Tabled;

pub const STUDENT_NAME: &str = "Student Name";
pub const CLASS: &str = "Class";
pub const GENDER: &str = "Gender";
pub const PRESENT: &str = "Present";

/// Columns every upload must carry, in the order they are reported when missing.
pub const IDENTITY_COLUMNS: [&str; 3] = [STUDENT_NAME, CLASS, GENDER];

/// Reasons a student was not counted present. Summed into `Is_Absent`.
pub const ABSENCE_COLUMNS: [&str; 11] = [
    "Absent",
    "Half-Day",
    "Leave",
    "Not responding",
    "Family Issue",
    "Not well",
    "Not interested",
    "Not understanding content",
    "Dot not know",
    "Village",
    "Other",
];

/// `Present` followed by the absence reasons: every column coerced to a number.
pub fn schema_columns() -> impl Iterator<Item = &'static str> {
    std::iter::once(PRESENT).chain(ABSENCE_COLUMNS)
}

/// Uninterpreted cell grid as read from the upload. Banner rows and the
/// header row are still part of `rows`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One student row after header cleanup, schema completion and coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub student_name: String,
    pub class: String,
    pub gender: String,
    pub present: f64,
    /// Indexed like [`ABSENCE_COLUMNS`].
    pub absences: [f64; ABSENCE_COLUMNS.len()],
}

impl NormalizedRecord {
    pub fn absence(&self, column: &str) -> Option<f64> {
        ABSENCE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|idx| self.absences[idx])
    }

    /// Value of any schema column by its header name.
    pub fn schema_value(&self, column: &str) -> Option<f64> {
        if column == PRESENT {
            Some(self.present)
        } else {
            self.absence(column)
        }
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4 + ABSENCE_COLUMNS.len()))?;
        map.serialize_entry(STUDENT_NAME, &self.student_name)?;
        map.serialize_entry(CLASS, &self.class)?;
        map.serialize_entry(GENDER, &self.gender)?;
        map.serialize_entry(PRESENT, &Count(self.present))?;
        for (name, value) in ABSENCE_COLUMNS.iter().zip(self.absences.iter()) {
            map.serialize_entry(name, &Count(*value))?;
        }
        map.end()
    }
}

/// What the normalizer did to the upload. Nothing here is an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    /// Zero-based index of the header row within the raw table.
    pub header_row: usize,
    pub data_rows: usize,
    pub blank_rows: usize,
    /// Rows removed by strict mode for lacking an identity value.
    pub dropped_rows: usize,
    /// Schema columns absent from the upload and filled with 0.
    pub synthesized_columns: Vec<String>,
    /// Non-empty schema cells that did not parse as a count.
    pub coerced_cells: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    /// Trimmed source headers followed by any synthesized schema columns.
    pub columns: Vec<String>,
    pub records: Vec<NormalizedRecord>,
    pub report: NormalizeReport,
}

impl NormalizedTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Per-row presence and absence totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedRecord {
    #[serde(rename = "Is_Present", serialize_with = "serialize_count")]
    pub is_present: f64,
    #[serde(rename = "Is_Absent", serialize_with = "serialize_count")]
    pub is_absent: f64,
}

/// Orders class labels numerically when both sides are numbers ("5" < "10"),
/// otherwise by text. Numeric labels sort ahead of text labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassKey(pub String);

impl ClassKey {
    fn numeric(&self) -> Option<f64> {
        self.0.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl Ord for ClassKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ClassKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SummaryRow {
    #[serde(rename = "Class")]
    #[tabled(rename = "Class")]
    pub class: String,
    #[serde(rename = "Gender")]
    #[tabled(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Total_Students")]
    #[tabled(rename = "Total_Students")]
    pub total_students: usize,
    #[serde(rename = "Total_Present", serialize_with = "serialize_count")]
    #[tabled(rename = "Total_Present", display_with = "display_count")]
    pub total_present: f64,
    #[serde(rename = "Total_Absent", serialize_with = "serialize_count")]
    #[tabled(rename = "Total_Absent", display_with = "display_count")]
    pub total_absent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
    /// Rows without a Class or Gender value; they belong to no group.
    pub ungrouped_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "Total_Students")]
    TotalStudents,
    #[serde(rename = "Total_Present")]
    TotalPresent,
    #[serde(rename = "Total_Absent")]
    TotalAbsent,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::TotalStudents, Metric::TotalPresent, Metric::TotalAbsent];

    pub fn label(self) -> &'static str {
        match self {
            Metric::TotalStudents => "Total_Students",
            Metric::TotalPresent => "Total_Present",
            Metric::TotalAbsent => "Total_Absent",
        }
    }

    pub fn of(self, row: &SummaryRow) -> f64 {
        match self {
            Metric::TotalStudents => row.total_students as f64,
            Metric::TotalPresent => row.total_present,
            Metric::TotalAbsent => row.total_absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotColumn {
    pub metric: Metric,
    pub gender: String,
}

impl PivotColumn {
    /// Single-level header used for CSV export, e.g. `Total_Present_Female`.
    pub fn flat_name(&self) -> String {
        format!("{}_{}", self.metric.label(), self.gender)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    #[serde(rename = "Class")]
    pub class: String,
    /// Aligned with [`PivotTable::columns`].
    #[serde(serialize_with = "serialize_counts")]
    pub values: Vec<f64>,
}

/// Summary reshaped to one row per class, with columns `(metric, gender)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotTable {
    pub columns: Vec<PivotColumn>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    /// Distinct genders in column order.
    pub fn genders(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for col in &self.columns {
            if !out.contains(&col.gender.as_str()) {
                out.push(&col.gender);
            }
        }
        out
    }

    pub fn value(&self, class: &str, metric: Metric, gender: &str) -> Option<f64> {
        let col = self
            .columns
            .iter()
            .position(|c| c.metric == metric && c.gender == gender)?;
        let row = self.rows.iter().find(|r| r.class == class)?;
        row.values.get(col).copied()
    }
}

/// Everything produced for one upload.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceReport {
    pub source: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub normalize: NormalizeReport,
    pub preview: Vec<NormalizedRecord>,
    pub summary: SummaryTable,
    pub pivot: PivotTable,
}
