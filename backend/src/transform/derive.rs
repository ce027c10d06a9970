//! Derived columns: admission month and diagnosis.
//!
//! Both are computed once per upload. Derivation is total: malformed input
//! becomes an absent value, never an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{Dataset, Record, YearMonth};

/// Placeholder a spreadsheet writes when a date cell is too narrow to render.
pub const OVERFLOW_SENTINEL: &str = "########";

/// Accepted date layouts, tried in order.
///
/// Two-digit years come before four-digit ones: `%y` rejects `2023`
/// (trailing input) while `%Y` would accept `23` as year 23. Year-first
/// layouts are only tried on values that start with four digits.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse an admission date.
///
/// Returns `None` for the overflow sentinel and for anything that does not
/// match one of the accepted layouts exactly.
pub fn parse_admission_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() || value == OVERFLOW_SENTINEL {
        return None;
    }

    let year_first = starts_with_year(value);
    let applicable = |fmt: &&&str| year_first || !fmt.starts_with("%Y");

    if let Some(date) = DATE_FORMATS
        .iter()
        .filter(applicable)
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Some(date);
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .filter(applicable)
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(dt.date());
    }

    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive())
}

fn starts_with_year(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() > 4 && bytes[..4].iter().all(u8::is_ascii_digit) && !bytes[4].is_ascii_digit()
}

/// Month of an admission date, if it parses.
pub fn parse_admission_month(raw: Option<&str>) -> Option<YearMonth> {
    raw.and_then(parse_admission_date).map(YearMonth::from_date)
}

/// Fill `admission_month` and `diagnosis` on every record.
///
/// `admission_date` and `medical_condition` are left untouched. When no
/// record yields a month, the dataset is flagged so the monthly chart can
/// fall back to a placeholder.
pub fn derive_columns(dataset: Dataset) -> Dataset {
    let has_diagnosis_column = dataset.has_diagnosis_column;

    let records: Vec<Record> = dataset
        .records
        .into_iter()
        .map(|record| Record {
            admission_month: parse_admission_month(record.admission_date.as_deref()),
            diagnosis: if has_diagnosis_column {
                record.medical_condition.clone()
            } else {
                None
            },
            ..record
        })
        .collect();

    let admission_month_usable = records.iter().any(|r| r.admission_month.is_some());

    Dataset {
        records,
        admission_month_usable,
        ..dataset
    }
}
