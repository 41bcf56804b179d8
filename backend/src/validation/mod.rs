//! Required column checks.
//!
//! A header row must name `96 Well`, `384 Well` and `Plate` exactly (case
//! and spelling). Nothing is converted when a column is missing.
//!
//! # Example
//!
//! ```rust,ignore
//! use platemap::validation::validate_columns;
//!
//! let headers = vec!["Plate".to_string(), "96 Well".to_string()];
//! let err = validate_columns(&headers).unwrap_err();
//! assert!(err.to_string().contains("384 Well"));
//! ```

use crate::error::ValidationError;
use crate::models::REQUIRED_COLUMNS;

/// Required columns absent from `headers`, in [`REQUIRED_COLUMNS`] order.
pub fn missing_columns<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h.as_ref() == **required))
        .map(|s| s.to_string())
        .collect()
}

/// Check that every required column is present.
pub fn validate_columns<S: AsRef<str>>(headers: &[S]) -> Result<(), ValidationError> {
    let missing = missing_columns(headers);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingColumns(missing))
    }
}

/// Returns `true` if every required column is present.
pub fn has_required_columns<S: AsRef<str>>(headers: &[S]) -> bool {
    missing_columns(headers).is_empty()
}
