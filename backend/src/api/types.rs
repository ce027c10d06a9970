//! REST API types for frontend integration.
//!
//! Every payload is camelCase JSON. Chart series are ready to hand to a
//! bar/line chart without further reshaping.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::FilterCriteria;
use crate::session::SessionSummary;
use crate::transform::pipeline::{Dashboard, DatasetInfo};

/// Response sent to the frontend after a CSV upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Session to use for subsequent dashboard queries
    pub session_id: String,

    /// Status: "ready" or "warning"
    pub status: String,

    /// Non-fatal data problems found during ingest
    pub warnings: Vec<String>,

    /// Columns, row count and selector domains
    pub dataset: DatasetInfo,

    /// Criteria covering the full observed domain
    pub default_criteria: FilterCriteria,

    /// Dashboard computed with `default_criteria`
    pub dashboard: Dashboard,
}

/// Response describing an existing session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session: SessionSummary,
    pub dataset: DatasetInfo,
    pub default_criteria: FilterCriteria,
}

/// Body of a dashboard query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRequest {
    #[serde(flatten)]
    pub criteria: FilterCriteria,

    /// Also return the filtered raw rows
    #[serde(default)]
    pub include_rows: bool,
}

/// Non-fatal warnings for a freshly loaded dataset.
pub fn dataset_warnings(info: &DatasetInfo) -> Vec<String> {
    let mut warnings = Vec::new();
    if info.row_count == 0 {
        warnings.push("The file has a header but no data rows.".to_string());
    }
    if !info.has_diagnosis_column {
        warnings.push(
            "No 'Medical Condition' column: diagnosis frequency unavailable.".to_string(),
        );
    }
    if !info.admission_month_usable {
        warnings.push("No usable admission dates: monthly admissions unavailable.".to_string());
    }
    warnings
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
