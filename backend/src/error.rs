//! Error types for the Platemap conversion pipeline.
//!
//! This module defines one error type per layer:
//!
//! - [`ParseError`] - File loading and header detection errors
//! - [`ValidationError`] - Required column checks
//! - [`SortError`] - Re-injection of sorted records
//! - [`ExportError`] - CSV / XLSX serialization errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Parsing Errors
// =============================================================================

/// Errors while loading a spreadsheet into a dataset.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV content.
    #[error("Invalid CSV format: {0}")]
    CsvError(#[from] csv::Error),

    /// Delimiter cannot be used by the CSV reader.
    #[error("Invalid delimiter '{0}': must be a single ASCII character")]
    InvalidDelimiter(char),

    /// Invalid XLSX workbook.
    #[error("Invalid XLSX workbook: {0}")]
    XlsxError(String),

    /// The file extension or requested format is not supported.
    #[error("Unsupported file format: {0} (expected csv or xlsx)")]
    UnsupportedFormat(String),

    /// Empty file or empty first worksheet.
    #[error("File is empty")]
    EmptyFile,

    /// Selected header row is past the end of the data.
    #[error("Header row {row} is out of range (file has {rows} rows)")]
    HeaderRowOutOfRange { row: usize, rows: usize },
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors reported before any transformation is attempted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One or more required columns are absent from the header row.
    #[error("The selected header row does not contain all required columns (missing: {})", .0.join(", "))]
    MissingColumns(Vec<String>),
}

// =============================================================================
// Sort Errors
// =============================================================================

/// Errors while splicing sorted records back into the original order.
#[derive(Debug, Error)]
pub enum SortError {
    /// Sorted sequence and sortable slots disagree in size.
    #[error("Sortable slot count mismatch: {slots} slots but {sorted} sorted records")]
    CardinalityMismatch { slots: usize, sorted: usize },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing a dataset.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to write output.
    #[error("Failed to write output: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV writer failure.
    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    /// XLSX writer failure.
    #[error("XLSX export error: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    /// Dataset does not fit in a worksheet.
    #[error("Dataset too large for a worksheet: {0}")]
    TooLarge(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by
/// [`crate::transform::pipeline::convert_file`]. It wraps all lower-level
/// errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading error.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Sort error.
    #[error("Sort error: {0}")]
    Sort(#[from] SortError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// No data rows below the header.
    #[error("No records to convert")]
    EmptyInput,
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

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for sort operations.
pub type SortResult<T> = Result<T, SortError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
