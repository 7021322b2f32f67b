use crate::error::{AttendanceError, Result};
use crate::types::{
    ClassKey, DerivedRecord, Metric, NormalizedRecord, NormalizedTable, PivotColumn, PivotRow,
    PivotTable, SummaryRow, SummaryTable, CLASS, GENDER, STUDENT_NAME,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// `Is_Present` copies `Present`; `Is_Absent` sums the absence reasons.
/// Both may be nonzero for the same row (a half-day, for instance).
pub fn derive(record: &NormalizedRecord) -> DerivedRecord {
    DerivedRecord {
        is_present: record.present,
        is_absent: record.absences.iter().sum(),
    }
}

pub fn aggregate(table: &NormalizedTable) -> Result<(SummaryTable, PivotTable)> {
    let summary = summarize(table)?;
    let pivot = pivot(&summary);
    Ok((summary, pivot))
}

/// Group by (Class, Gender), ordered by class then gender.
pub fn summarize(table: &NormalizedTable) -> Result<SummaryTable> {
    let missing: Vec<&str> = [STUDENT_NAME, CLASS, GENDER]
        .into_iter()
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() {
        return Err(AttendanceError::Aggregation(format!(
            "table lacks column(s) {}",
            missing.join(", ")
        )));
    }

    #[derive(Default)]
    struct Acc {
        students: usize,
        present: f64,
        absent: f64,
    }

    let mut groups: BTreeMap<(ClassKey, String), Acc> = BTreeMap::new();
    let mut ungrouped_rows = 0usize;
    for r in &table.records {
        if r.class.is_empty() || r.gender.is_empty() {
            ungrouped_rows += 1;
            continue;
        }
        let derived = derive(r);
        let e = groups
            .entry((ClassKey(r.class.clone()), r.gender.clone()))
            .or_default();
        // Counts named students, like a non-null count over the name column.
        if !r.student_name.is_empty() {
            e.students += 1;
        }
        e.present += derived.is_present;
        e.absent += derived.is_absent;
    }
    if ungrouped_rows > 0 {
        debug!("{} rows have no class or gender and are not grouped", ungrouped_rows);
    }

    let rows = groups
        .into_iter()
        .map(|((class, gender), acc)| SummaryRow {
            class: class.0,
            gender,
            total_students: acc.students,
            total_present: acc.present,
            total_absent: acc.absent,
        })
        .collect();
    Ok(SummaryTable {
        rows,
        ungrouped_rows,
    })
}

/// One row per class; columns are every (metric, gender) pair, metric-major.
/// Pairs with no summary row are 0.
pub fn pivot(summary: &SummaryTable) -> PivotTable {
    let genders: BTreeSet<&str> = summary.rows.iter().map(|r| r.gender.as_str()).collect();
    let columns: Vec<PivotColumn> = Metric::ALL
        .iter()
        .flat_map(|metric| {
            genders.iter().map(move |g| PivotColumn {
                metric: *metric,
                gender: g.to_string(),
            })
        })
        .collect();

    let mut classes: Vec<&str> = Vec::new();
    let mut lookup: HashMap<(&str, &str), &SummaryRow> = HashMap::new();
    for r in &summary.rows {
        // Summary rows arrive sorted by class, so first-seen order is sorted too.
        if classes.last() != Some(&r.class.as_str()) {
            classes.push(&r.class);
        }
        lookup.insert((r.class.as_str(), r.gender.as_str()), r);
    }

    let rows = classes
        .into_iter()
        .map(|class| PivotRow {
            class: class.to_string(),
            values: columns
                .iter()
                .map(|col| {
                    lookup
                        .get(&(class, col.gender.as_str()))
                        .map(|r| col.metric.of(r))
                        .unwrap_or(0.0)
                })
                .collect(),
        })
        .collect();

    PivotTable { columns, rows }
}
