//! High-level conversion pipeline.
//!
//! Combines every step: loading, header selection, column validation,
//! position assignment and sorting.
//!
//! # Example
//!
//! ```rust,ignore
//! use platemap::{convert_file, ConvertOptions, ViewMode};
//!
//! let options = ConvertOptions { mode: ViewMode::Layout384, ..Default::default() };
//! let result = convert_file("plates.xlsx", &options)?;
//! println!("{} rows in {}", result.dataset.len(), result.mode);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Dataset, FileFormat, ViewMode};
use crate::parser::{parse_bytes, parse_file, RawSheet, DEFAULT_HEADER_SCAN_ROWS};
use crate::validation::validate_columns;

use super::position::assign_global_positions;
use super::sorter::sort_by_view_mode;
use super::wells::Well96Key;

/// Options for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Target ordering
    pub mode: ViewMode,

    /// Header row index; detected when `None`
    pub header_row: Option<usize>,

    /// Rows searched by header detection
    pub header_scan_rows: usize,

    /// Input format; taken from the file extension when `None`
    pub format: Option<FileFormat>,

    /// CSV delimiter; detected when `None`
    pub delimiter: Option<char>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            mode: ViewMode::default(),
            header_row: None,
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            format: None,
            delimiter: None,
        }
    }
}

/// Loaded file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub format: FileFormat,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Row counts per category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertStats {
    /// Rows with Plate, 96 Well and 384 Well all present
    pub sortable: usize,
    /// Rows left in their original slot
    pub incomplete: usize,
    /// Sortable rows without a global position
    pub unpositioned: usize,
    /// Sortable rows whose 96-well label did not parse
    pub unrecognized_96: usize,
}

impl ConvertStats {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut stats = Self::default();
        for record in &dataset.records {
            if !record.is_sortable() {
                stats.incomplete += 1;
                continue;
            }
            stats.sortable += 1;
            if record.global_384_position.is_none() {
                stats.unpositioned += 1;
            }
            let recognized = record
                .well_96
                .as_deref()
                .map(|label| Well96Key::parse(label).is_recognized())
                .unwrap_or(false);
            if !recognized {
                stats.unrecognized_96 += 1;
            }
        }
        stats
    }
}

/// Result of a complete conversion
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Sorted dataset, position column included
    pub dataset: Dataset,
    pub mode: ViewMode,
    /// Header row used
    pub header_row: usize,
    /// Whether the header row came from detection
    pub header_detected: bool,
    pub sheet_info: SheetInfo,
    pub stats: ConvertStats,
}

/// Assign positions and sort a dataset.
///
/// This is the pure core of the pipeline: it logs nothing and touches no
/// files.
pub fn convert_dataset(dataset: Dataset, mode: ViewMode) -> PipelineResult<Dataset> {
    validate_columns(&dataset.columns)?;
    let positioned = assign_global_positions(dataset);
    Ok(sort_by_view_mode(&positioned, mode)?)
}

/// Convert a spreadsheet file.
pub fn convert_file<P: AsRef<Path>>(path: P, options: &ConvertOptions) -> PipelineResult<ConvertResult> {
    log_info(format!("📖 Reading {}...", path.as_ref().display()));
    let sheet = parse_file(path, options.format, options.delimiter)?;
    convert_sheet(sheet, options)
}

/// Convert spreadsheet bytes of a known format.
pub fn convert_bytes(bytes: &[u8], format: FileFormat, options: &ConvertOptions) -> PipelineResult<ConvertResult> {
    log_info(format!("📖 Reading {} bytes of {}...", bytes.len(), format));
    let sheet = parse_bytes(bytes, format, options.delimiter)?;
    convert_sheet(sheet, options)
}

/// Pick the header row: the explicit one, the detected one, or row 0.
///
/// Returns the row index and whether it was detected.
pub fn resolve_header_row(sheet: &RawSheet, options: &ConvertOptions) -> (usize, bool) {
    if let Some(row) = options.header_row {
        return (row, false);
    }

    match sheet.find_header_row(options.header_scan_rows) {
        Some(row) => (row, true),
        None => {
            log_warning("No header row detected automatically, using row 0");
            (0, false)
        }
    }
}

/// Convert an already loaded sheet.
pub fn convert_sheet(sheet: RawSheet, options: &ConvertOptions) -> PipelineResult<ConvertResult> {
    log_success(format!("Read {} rows ({})", sheet.rows.len(), sheet.format));
    if let Some(ref encoding) = sheet.encoding {
        log_info_indent(format!("Encoding: {}", encoding), 1);
    }
    if let Some(delimiter) = sheet.delimiter {
        log_info_indent(format!("Separator: '{}'", format_delimiter(delimiter)), 1);
    }

    // Header row
    log_info("🔍 Header row detection...");
    let (header_row, header_detected) = resolve_header_row(&sheet, options);
    if header_detected {
        log_success(format!("Detected header row at index {}", header_row));
    } else if options.header_row.is_some() {
        log_info_indent(format!("Using selected header row {}", header_row), 1);
    }

    let headers = sheet.headers(header_row)?;
    validate_columns(&headers)?;
    log_success(format!("{} columns, required columns present", headers.len()));

    let sheet_info = SheetInfo {
        format: sheet.format,
        encoding: sheet.encoding.clone(),
        delimiter: sheet.delimiter,
        headers,
        row_count: sheet.rows.len(),
    };

    let dataset = sheet.into_dataset(header_row)?;
    if dataset.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    // Positions and sort
    log_info(format!("⚙️  Sorting {} records by {}...", dataset.len(), options.mode));
    let sorted = convert_dataset(dataset, options.mode)?;
    let stats = ConvertStats::from_dataset(&sorted);
    print_stats(&stats, options.mode);

    Ok(ConvertResult {
        dataset: sorted,
        mode: options.mode,
        header_row,
        header_detected,
        sheet_info,
        stats,
    })
}

fn print_stats(stats: &ConvertStats, mode: ViewMode) {
    log_success(format!("{} sortable rows reordered", stats.sortable));
    if stats.incomplete > 0 {
        log_info_indent(format!("{} incomplete rows kept in place", stats.incomplete), 1);
    }
    if mode == ViewMode::Layout384 && stats.unpositioned > 0 {
        log_warning(format!(
            "{} rows have no global 384 position and were placed last",
            stats.unpositioned
        ));
    }
    if mode == ViewMode::Layout96 && stats.unrecognized_96 > 0 {
        log_warning(format!(
            "{} rows have an unrecognized 96 well label and were placed last in their plate",
            stats.unrecognized_96
        ));
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, ValidationError};
    use crate::models::Cell;

    const LAYOUT: &str = "\
Experiment 42,,,,
,,,,
Sample,Plate,96 Well,384 Well,Note
a,5,A1,A1,
b,1,B1,C1,
c,,A1,A1,blank plate
d,1,A1,A2,
e,2,A1,X99,bad 384 label
";

    fn samples(result: &ConvertResult) -> Vec<String> {
        result
            .dataset
            .records
            .iter()
            .map(|r| r.extra["Sample"].to_string())
            .collect()
    }

    #[test]
    fn test_default_options() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.mode, ViewMode::Layout96);
        assert_eq!(opts.header_row, None);
        assert_eq!(opts.header_scan_rows, 20);
    }

    #[test]
    fn test_convert_96_layout_with_detected_header() {
        let result = convert_bytes(LAYOUT.as_bytes(), FileFormat::Csv, &ConvertOptions::default()).unwrap();

        assert!(result.header_detected);
        assert_eq!(result.header_row, 1);
        // Plate 1: d(A1), b(B1); Plate 2: e; Plate 5: a; c stays in slot 2
        assert_eq!(samples(&result), vec!["d", "b", "c", "e", "a"]);
        assert_eq!(
            result.stats,
            ConvertStats { sortable: 4, incomplete: 1, unpositioned: 1, unrecognized_96: 0 }
        );
    }

    #[test]
    fn test_convert_384_layout() {
        let options = ConvertOptions { mode: ViewMode::Layout384, ..Default::default() };
        let result = convert_bytes(LAYOUT.as_bytes(), FileFormat::Csv, &options).unwrap();

        // d=2, b=49, a=385, e has no position
        assert_eq!(samples(&result), vec!["d", "b", "c", "a", "e"]);
        assert_eq!(result.dataset.columns.last().map(String::as_str), Some("Global_384_Position"));
        assert_eq!(result.dataset.records[2].extra["Note"], Cell::from("blank plate"));
    }

    #[test]
    fn test_missing_columns_stop_conversion() {
        let csv = "Sample,Plate,96 Well\na,1,A1\n";
        let err = convert_bytes(csv.as_bytes(), FileFormat::Csv, &ConvertOptions::default()).unwrap_err();

        match err {
            PipelineError::Validation(ValidationError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["384 Well"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_explicit_header_row_overrides_detection() {
        let options = ConvertOptions { header_row: Some(0), ..Default::default() };
        let err = convert_bytes(LAYOUT.as_bytes(), FileFormat::Csv, &options).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        let options = ConvertOptions { header_row: Some(40), ..Default::default() };
        let err = convert_bytes(LAYOUT.as_bytes(), FileFormat::Csv, &options).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(ParseError::HeaderRowOutOfRange { .. })));
    }

    #[test]
    fn test_header_only_is_empty_input() {
        let csv = "Plate,96 Well,384 Well\n";
        let err = convert_bytes(csv.as_bytes(), FileFormat::Csv, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn test_convert_dataset_is_idempotent() {
        let result = convert_bytes(LAYOUT.as_bytes(), FileFormat::Csv, &ConvertOptions::default()).unwrap();
        let again = convert_dataset(result.dataset.clone(), ViewMode::Layout96).unwrap();
        assert_eq!(again, result.dataset);
    }

    #[test]
    fn test_convert_file_semicolon_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plates.csv");
        std::fs::write(&path, "Plate;96 Well;384 Well\n2;A1;A1\n1;A1;A1\n").unwrap();

        let result = convert_file(&path, &ConvertOptions::default()).unwrap();
        assert_eq!(result.sheet_info.delimiter, Some(';'));
        assert_eq!(result.dataset.records[0].plate, Some(1.0));
        assert_eq!(result.dataset.records[1].plate, Some(2.0));
    }
}
