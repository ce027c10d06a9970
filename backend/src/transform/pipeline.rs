//! High-level pipeline API.
//!
//! Combines the steps a dashboard needs: ingest + derive once per upload,
//! then filter + aggregate on every selector change.
//!
//! # Example
//!
//! ```rust,ignore
//! use healthdash::transform::pipeline::{build_dashboard, load_file};
//! use healthdash::FilterCriteria;
//!
//! let dataset = load_file("patients.csv")?;
//! let criteria = FilterCriteria::full_domain(&dataset);
//! let dashboard = build_dashboard(&dataset, &criteria, false);
//! println!("{} patients", dashboard.summary.patient_count);
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use super::aggregate::{diagnosis_frequency, monthly_admissions, summarize};
use super::derive::derive_columns;
use super::filter::{age_bounds_or_default, filter};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{IngestResult, PipelineResult};
use crate::models::{
    Dataset, DiagnosisCount, FilterCriteria, FilteredView, MonthlyCount, Record, Summary,
    COL_ADMISSION_MONTH, COL_DIAGNOSIS,
};
use crate::parser::parse_bytes_auto;
use crate::validation::build_dataset;

/// Shown instead of the diagnosis chart when there is nothing to plot.
pub const NO_DIAGNOSIS_MESSAGE: &str = "No diagnosis data available.";

/// Shown instead of the monthly chart when no row has an admission month.
pub const NO_ADMISSION_DATE_MESSAGE: &str =
    "Admission date data is missing; cannot plot monthly admissions.";

/// Everything the dashboard renders for one set of criteria.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub criteria: FilterCriteria,
    pub summary: Summary,
    /// `$1,234.56` or `N/A`
    pub average_billing_display: String,
    pub diagnosis_frequency: Vec<DiagnosisCount>,
    pub monthly_admissions: Vec<MonthlyCount>,
    /// Set when `diagnosis_frequency` is empty.
    pub diagnosis_placeholder: Option<String>,
    /// Set when `monthly_admissions` is empty.
    pub monthly_placeholder: Option<String>,
    /// Filtered raw rows, only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Value>>,
}

/// Shape of an uploaded dataset, for populating the selectors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub age_min: i64,
    pub age_max: i64,
    pub gender_options: Vec<String>,
    pub admission_type_options: Vec<String>,
    pub has_diagnosis_column: bool,
    pub admission_month_usable: bool,
}

impl DatasetInfo {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let (age_min, age_max) = age_bounds_or_default(dataset);
        Self {
            encoding: dataset.encoding.clone(),
            delimiter: format_delimiter(dataset.delimiter).to_string(),
            row_count: dataset.len(),
            columns: dataset.headers.clone(),
            age_min,
            age_max,
            gender_options: dataset.gender_options(),
            admission_type_options: dataset.admission_type_options(),
            has_diagnosis_column: dataset.has_diagnosis_column,
            admission_month_usable: dataset.admission_month_usable,
        }
    }
}

/// Parse, type and derive an uploaded CSV. No logging.
pub fn ingest(bytes: &[u8]) -> IngestResult<Dataset> {
    let parsed = parse_bytes_auto(bytes)?;
    let dataset = build_dataset(parsed)?;
    Ok(derive_columns(dataset))
}

/// Load CSV bytes into a derived [`Dataset`], logging progress.
pub fn load_bytes(bytes: &[u8]) -> PipelineResult<Dataset> {
    log_info("📖 Reading CSV upload...");
    log_info("Detecting encoding and separator...");
    let parsed = parse_bytes_auto(bytes)?;
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.table.rows.len()));

    let dataset = build_dataset(parsed)?;
    log_info(format!("📋 CSV has {} columns:", dataset.headers.len()));
    for (i, col) in dataset.headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    log_info("⚙️  Deriving admission month and diagnosis...");
    let dataset = derive_columns(dataset);
    report_derived(&dataset);

    Ok(dataset)
}

/// Load a CSV file into a derived [`Dataset`], logging progress.
pub fn load_file<P: AsRef<Path>>(path: P) -> PipelineResult<Dataset> {
    log_info(format!("📄 Processing: {}", path.as_ref().display()));
    let bytes = std::fs::read(path.as_ref())?;
    load_bytes(&bytes)
}

fn report_derived(dataset: &Dataset) {
    if dataset.is_empty() {
        log_warning("CSV has a header but no data rows");
        return;
    }

    if dataset.has_diagnosis_column {
        let with_diagnosis = dataset.records.iter().filter(|r| r.diagnosis.is_some()).count();
        log_success(format!("{} rows with a diagnosis", with_diagnosis));
    } else {
        log_warning("No 'Medical Condition' column: diagnosis chart disabled");
    }

    if dataset.admission_month_usable {
        let with_month = dataset.records.iter().filter(|r| r.admission_month.is_some()).count();
        log_success(format!("{} rows with a parseable admission date", with_month));
    } else {
        log_warning("No parseable admission dates: monthly chart disabled");
    }

    let missing_age = dataset.records.iter().filter(|r| r.age.is_none()).count();
    if missing_age > 0 {
        log_warning(format!("{} rows have no age and will never pass the filter", missing_age));
    }
}

/// Filter the dataset and compute every view the dashboard shows.
pub fn build_dashboard(
    dataset: &Dataset,
    criteria: &FilterCriteria,
    include_rows: bool,
) -> Dashboard {
    let view = filter(dataset, criteria);
    let summary = summarize(&view);
    let diagnosis = diagnosis_frequency(&view);
    let monthly = monthly_admissions(&view);

    Dashboard {
        criteria: criteria.clone(),
        average_billing_display: summary.average_billing.display(),
        summary,
        diagnosis_placeholder: diagnosis
            .is_empty()
            .then(|| NO_DIAGNOSIS_MESSAGE.to_string()),
        monthly_placeholder: monthly
            .is_empty()
            .then(|| NO_ADMISSION_DATE_MESSAGE.to_string()),
        diagnosis_frequency: diagnosis,
        monthly_admissions: monthly,
        rows: include_rows.then(|| view_rows(dataset, &view)),
    }
}

/// Render filtered rows as header → cell objects, plus the derived columns.
pub fn view_rows(dataset: &Dataset, view: &FilteredView<'_>) -> Vec<Value> {
    view.iter().map(|record| row_to_json(&dataset.headers, record)).collect()
}

fn row_to_json(headers: &[String], record: &Record) -> Value {
    let mut obj = Map::new();
    for (header, cell) in headers.iter().zip(record.cells.iter()) {
        obj.insert(header.clone(), Value::String(cell.clone()));
    }
    obj.insert(
        COL_ADMISSION_MONTH.to_string(),
        record
            .admission_month
            .map(|m| Value::String(m.to_string()))
            .unwrap_or(Value::Null),
    );
    obj.insert(
        COL_DIAGNOSIS.to_string(),
        record.diagnosis.clone().map(Value::String).unwrap_or(Value::Null),
    );
    Value::Object(obj)
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}
