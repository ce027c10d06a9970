//! # Healthdash - patient admission dashboards from CSV exports
//!
//! Healthdash ingests a hospital admissions CSV, derives an admission month
//! and a diagnosis per row, then filters and aggregates it into the views an
//! interactive dashboard renders.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│   Derive    │────▶│  Dashboard  │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (month/diag)│     │ (filter+agg)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use healthdash::{build_dashboard, load_file, FilterCriteria};
//!
//! let dataset = load_file("patients.csv")?;
//! let criteria = FilterCriteria::full_domain(&dataset);
//! let dashboard = build_dashboard(&dataset, &criteria, false);
//! println!("Average billing: {}", dashboard.average_billing_display);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Record, Dataset, FilterCriteria, Summary)
//! - [`parser`] - CSV parsing with auto-detection
//! - [`validation`] - Required columns and numeric typing
//! - [`transform`] - Derive, filter, aggregate and pipeline
//! - [`session`] - In-memory upload sessions
//! - [`config`] - Server configuration from the environment
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Sessions
pub mod session;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    EmptyDatasetError,
    IngestError,
    IngestResult,
    PipelineError,
    PipelineResult,
    ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AverageBilling,
    Dataset,
    DiagnosisCount,
    FilterCriteria,
    FilteredView,
    MonthlyCount,
    Record,
    Summary,
    YearMonth,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_file_auto,
    CsvError,
    ParseResult,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{build_dataset, check_required_columns};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    build_dashboard,
    compute_age_bounds,
    derive_columns,
    diagnosis_frequency,
    filter,
    ingest,
    load_bytes,
    load_file,
    monthly_admissions,
    summarize,
    Dashboard,
    DatasetInfo,
};

// =============================================================================
// Re-exports - Sessions / Config
// =============================================================================

pub use config::ServerConfig;
pub use session::SessionStore;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
