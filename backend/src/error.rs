//! Error types for the Healthdash pipeline.
//!
//! This module defines the error hierarchy:
//!
//! - [`IngestError`] - CSV decoding and column checks (fatal for one upload)
//! - [`EmptyDatasetError`] - a computation had no usable rows (resolved locally)
//! - [`PipelineError`] - Top-level load errors
//! - [`ConfigError`] - Invalid environment configuration
//! - [`ServerError`] - HTTP layer errors
//!
//! Conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::parser::CsvError;

// =============================================================================
// Ingest Errors
// =============================================================================

/// Errors while turning uploaded bytes into a [`crate::models::Dataset`].
///
/// No partial dataset is ever produced when one of these is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Failed to read the file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The content is not valid delimited text.
    #[error("Invalid CSV format: {0}")]
    Parse(#[from] CsvError),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Required columns are absent from the header row.
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A numeric column holds a value that is not a number.
    #[error("Column '{column}' must be numeric (line {line}, value '{value}')")]
    NonNumeric {
        column: String,
        line: usize,
        value: String,
    },
}

impl IngestError {
    /// Message suitable for showing to the person who uploaded the file.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingColumns(cols) => format!(
                "The uploaded file is missing required column(s): {}. \
                 Expected at least Age, Gender and Admission Type.",
                cols.join(", ")
            ),
            Self::EmptyFile => "The uploaded file is empty.".to_string(),
            other => format!("The uploaded file could not be read: {}", other),
        }
    }
}

// =============================================================================
// Empty Dataset
// =============================================================================

/// A computation found no row with the value it needs.
///
/// Never crosses the component boundary: callers resolve it into a
/// placeholder or fallback value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No rows with a present {column}")]
pub struct EmptyDatasetError {
    pub column: &'static str,
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level load errors.
///
/// This is the error type returned by [`crate::transform::pipeline::load_bytes`]
/// and [`crate::transform::pipeline::load_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Ingest error.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// IO error outside of ingest (e.g. writing output).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Message suitable for showing to the person who uploaded the file.
    pub fn user_message(&self) -> String {
        match self {
            Self::Ingest(e) => e.user_message(),
            Self::Io(e) => format!("Internal IO error: {}", e),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid value '{value}' for {key}: {message}")]
    Invalid {
        key: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unknown session id.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Upload exceeds the configured size limit.
    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
