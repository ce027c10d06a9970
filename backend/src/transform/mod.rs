//! Table pipeline.
//!
//! This module turns an uploaded table into the views the dashboard renders:
//! - Derive: admission month and diagnosis columns
//! - Filter: age range, gender and admission type selection
//! - Aggregate: key metrics, diagnosis frequency, monthly admissions
//! - Pipeline: load entry points and dashboard assembly

pub mod aggregate;
pub mod derive;
pub mod filter;
pub mod pipeline;

pub use aggregate::{diagnosis_frequency, monthly_admissions, summarize};
pub use derive::{derive_columns, parse_admission_date, parse_admission_month, OVERFLOW_SENTINEL};
pub use filter::{age_bounds_or_default, compute_age_bounds, filter, filter_records};
pub use pipeline::*;
