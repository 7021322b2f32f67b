// Utility helpers for coercion, capitalization and number formatting.
//
// This module centralizes the "dirty" cell handling so the rest of the code
// can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use serde::{Serialize, Serializer};

/// Parse an attendance cell into a count while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (`"yes"`, `"NaN"`).
/// - Strips thousands separators like `","` before parsing.
/// - Rejects negative and non-finite results.
///
/// Returns `None` for anything that is not a usable count; callers store 0.
pub fn parse_count(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Canonical capitalized form: first character upper case, the rest lower.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Counts print as integers when whole (half-days aside, they usually are).
pub fn format_count(n: f64) -> String {
    if is_integral(n) {
        format_int(n as i64)
    } else {
        format_number(n, 2)
    }
}

/// Same as [`format_count`] without thousands separators, for file exports.
pub fn plain_count(n: f64) -> String {
    if is_integral(n) {
        (n as i64).to_string()
    } else {
        format!("{:.2}", n)
    }
}

pub fn display_count(n: &f64) -> String {
    format_count(*n)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Serializes whole counts as integers (`1`, not `1.0`) in CSV and JSON.
#[derive(Debug, Clone, Copy)]
pub struct Count(pub f64);

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if is_integral(self.0) {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

pub fn serialize_count<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    Count(*n).serialize(serializer)
}

pub fn serialize_counts<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(|v| Count(*v)))
}
