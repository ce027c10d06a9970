//! Domain models for the Healthdash pipeline.
//!
//! These types represent the typed patient table and the derived views
//! the dashboard renders.
//!
//! # Types
//!
//! - [`Record`] - One patient row with explicit optional fields
//! - [`Dataset`] - All records of one upload plus column metadata
//! - [`YearMonth`] - Calendar month used for the admissions timeline
//! - [`FilterCriteria`] - Selector state (age range, genders, admission types)
//! - [`FilteredView`] - Rows of a dataset matching some criteria
//! - [`Summary`] / [`AverageBilling`] - Key metrics
//! - [`DiagnosisCount`] / [`MonthlyCount`] - Chart-ready aggregate rows

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Column names
// =============================================================================

pub const COL_AGE: &str = "Age";
pub const COL_GENDER: &str = "Gender";
pub const COL_ADMISSION_TYPE: &str = "Admission Type";
pub const COL_MEDICAL_CONDITION: &str = "Medical Condition";
pub const COL_DATE_OF_ADMISSION: &str = "Date of Admission";
pub const COL_BILLING_AMOUNT: &str = "Billing Amount";

/// Columns an upload must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = [COL_AGE, COL_GENDER, COL_ADMISSION_TYPE];

/// Derived column names used when rows are rendered as a table.
pub const COL_ADMISSION_MONTH: &str = "Admission Month";
pub const COL_DIAGNOSIS: &str = "Diagnosis";

// =============================================================================
// YearMonth
// =============================================================================

/// A calendar month. Orders chronologically; displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{}'", s))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in '{}'", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in '{}'", s))?;
        YearMonth::new(year, month).ok_or_else(|| format!("month out of range in '{}'", s))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Record
// =============================================================================

/// One patient row.
///
/// Raw fields come from the upload; `admission_month` and `diagnosis` are
/// filled by [`crate::transform::derive_columns`] and never supplied by the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub admission_type: Option<String>,
    pub medical_condition: Option<String>,
    pub admission_date: Option<String>,
    pub billing_amount: Option<f64>,

    pub admission_month: Option<YearMonth>,
    pub diagnosis: Option<String>,

    /// Original cells, aligned with [`Dataset::headers`].
    #[serde(skip)]
    pub cells: Vec<String>,
    /// Line in the uploaded file (1-based, header is line 1).
    #[serde(skip)]
    pub line: usize,
}

// =============================================================================
// Dataset
// =============================================================================

/// The full parsed table for one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Header names in file order.
    pub headers: Vec<String>,
    /// Records in upload order.
    pub records: Vec<Record>,
    /// Detected text encoding of the upload.
    pub encoding: String,
    /// Detected delimiter of the upload.
    pub delimiter: char,
    /// Whether the upload had a `Medical Condition` column.
    pub has_diagnosis_column: bool,
    /// `false` when no row yields an admission month.
    pub admission_month_usable: bool,
}

impl Dataset {
    /// Build a dataset straight from typed records, with the standard header.
    ///
    /// Derived fields are left as given; run
    /// [`crate::transform::derive_columns`] to fill them.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            headers: [
                COL_AGE,
                COL_GENDER,
                COL_ADMISSION_TYPE,
                COL_MEDICAL_CONDITION,
                COL_DATE_OF_ADMISSION,
                COL_BILLING_AMOUNT,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            records,
            encoding: "utf-8".to_string(),
            delimiter: ',',
            has_diagnosis_column: true,
            admission_month_usable: false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Distinct present genders in first-appearance order.
    pub fn gender_options(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.gender.as_deref()))
    }

    /// Distinct present admission types in first-appearance order.
    pub fn admission_type_options(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.admission_type.as_deref()))
    }
}

fn distinct_in_order<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for value in values.flatten() {
        if seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}

// =============================================================================
// Filtering
// =============================================================================

/// Selector state. Rebuilt from UI input on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub age_min: i64,
    pub age_max: i64,
    pub allowed_genders: BTreeSet<String>,
    pub allowed_admission_types: BTreeSet<String>,
}

impl FilterCriteria {
    pub fn new<G, T>(age_min: i64, age_max: i64, genders: G, admission_types: T) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            age_min,
            age_max,
            allowed_genders: genders.into_iter().map(Into::into).collect(),
            allowed_admission_types: admission_types.into_iter().map(Into::into).collect(),
        }
    }
}

/// Rows of a dataset that satisfied a [`FilterCriteria`], in dataset order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView<'a> {
    rows: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    pub fn new(rows: Vec<&'a Record>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().copied()
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Mean billing amount, or an explicit marker when there is nothing to average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AverageBilling {
    Amount(f64),
    Unavailable,
}

impl AverageBilling {
    /// `$1,234.56` or `N/A`.
    pub fn display(&self) -> String {
        match self {
            Self::Amount(v) => format_currency(*v),
            Self::Unavailable => "N/A".to_string(),
        }
    }
}

/// Serialized as a plain number, or the string `"unavailable"`.
impl Serialize for AverageBilling {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Amount(v) => serializer.serialize_f64(*v),
            Self::Unavailable => serializer.serialize_str("unavailable"),
        }
    }
}

/// Format a dollar amount with thousands separators and two decimals.
pub fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac_part)
}

/// Key metrics for a filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub patient_count: usize,
    pub average_billing: AverageBilling,
}

/// One bar of the diagnosis frequency chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisCount {
    pub diagnosis: String,
    pub count: usize,
}

/// One point of the monthly admissions chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub month: YearMonth,
    pub count: usize,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_ordering() {
        let dec = YearMonth::new(2022, 12).unwrap();
        let jan = YearMonth::new(2023, 1).unwrap();
        let feb = YearMonth::new(2023, 2).unwrap();
        assert!(dec < jan);
        assert!(jan < feb);
    }

    #[test]
    fn test_year_month_rejects_bad_month() {
        assert!(YearMonth::new(2023, 0).is_none());
        assert!(YearMonth::new(2023, 13).is_none());
    }

    #[test]
    fn test_year_month_display_and_parse() {
        let ym = YearMonth::new(2023, 2).unwrap();
        assert_eq!(ym.to_string(), "2023-02");
        assert_eq!("2023-02".parse::<YearMonth>().unwrap(), ym);
        assert!("2023-13".parse::<YearMonth>().is_err());
        assert!("February".parse::<YearMonth>().is_err());
        assert_eq!(YearMonth::from_date(NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()), ym);
    }

    #[test]
    fn test_year_month_serialization() {
        let count = MonthlyCount {
            month: YearMonth::new(2023, 1).unwrap(),
            count: 4,
        };
        let json = serde_json::to_value(count).unwrap();
        assert_eq!(json, serde_json::json!({ "month": "2023-01", "count": 4 }));

        let back: MonthlyCount = serde_json::from_value(json).unwrap();
        assert_eq!(back, count);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(200.0), "$200.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-1500.0), "-$1,500.00");
    }

    #[test]
    fn test_average_billing_serialization() {
        assert_eq!(
            serde_json::to_value(AverageBilling::Amount(200.0)).unwrap(),
            serde_json::json!(200.0)
        );
        assert_eq!(
            serde_json::to_value(AverageBilling::Unavailable).unwrap(),
            serde_json::json!("unavailable")
        );
        assert_eq!(AverageBilling::Unavailable.display(), "N/A");
    }

    #[test]
    fn test_options_first_appearance_order() {
        let records = vec![
            Record {
                gender: Some("F".into()),
                admission_type: Some("Urgent".into()),
                ..Default::default()
            },
            Record {
                gender: None,
                admission_type: Some("Emergency".into()),
                ..Default::default()
            },
            Record {
                gender: Some("M".into()),
                admission_type: Some("Urgent".into()),
                ..Default::default()
            },
            Record {
                gender: Some("F".into()),
                admission_type: None,
                ..Default::default()
            },
        ];
        let dataset = Dataset::from_records(records);

        assert_eq!(dataset.gender_options(), vec!["F", "M"]);
        assert_eq!(dataset.admission_type_options(), vec!["Urgent", "Emergency"]);
    }

    #[test]
    fn test_filter_criteria_json_shape() {
        let criteria = FilterCriteria::new(18, 99, ["M", "F"], ["Emergency"]);
        let json = serde_json::to_value(&criteria).unwrap();
        assert_eq!(json["ageMin"], 18);
        assert_eq!(json["allowedGenders"], serde_json::json!(["F", "M"]));

        let back: FilterCriteria = serde_json::from_value(json).unwrap();
        assert_eq!(back, criteria);
    }
}
