//! Domain models for the Platemap conversion pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Cell`] - A single spreadsheet value, kept verbatim for passthrough columns
//! - [`Record`] - One row, with typed key fields and an open passthrough map
//! - [`Dataset`] - Ordered records plus the ordered column list
//! - [`ViewMode`] - Target ordering (96-well or 384-well layout)
//! - [`FileFormat`] - Spreadsheet format for loading and export

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// =============================================================================
// Column Names
// =============================================================================

/// Physical 96-well plate number.
pub const PLATE_COLUMN: &str = "Plate";

/// Well label within the 96-well plate.
pub const WELL_96_COLUMN: &str = "96 Well";

/// Well label within the 384-well plate.
pub const WELL_384_COLUMN: &str = "384 Well";

/// Derived global position across 384-well plate groups.
pub const POSITION_COLUMN: &str = "Global_384_Position";

/// Columns a header row must contain before any conversion is attempted.
pub const REQUIRED_COLUMNS: [&str; 3] = [WELL_96_COLUMN, WELL_384_COLUMN, PLATE_COLUMN];

// =============================================================================
// Cell
// =============================================================================

/// A single spreadsheet value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a cell from a raw CSV field. Blank fields are empty.
    pub fn from_csv(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric coercion. Booleans count as 1 and 0; anything else that is not
    /// a finite number becomes `None`.
    pub fn to_number(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(n) => *n,
            Cell::Bool(b) => f64::from(u8::from(*b)),
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Empty => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Text form of a well label, `None` when the cell is empty.
    pub fn to_label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Number(n) => write!(f, "{}", format_number(*n)),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// =============================================================================
// Record
// =============================================================================

/// One row of a plate layout.
///
/// The three key columns are typed; every other column is kept verbatim in
/// `extra`, keyed by its header name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Plate number after numeric coercion.
    pub plate: Option<f64>,
    pub well_96: Option<String>,
    pub well_384: Option<String>,
    /// Filled in by [`crate::transform::assign_global_positions`].
    pub global_384_position: Option<u64>,
    pub extra: HashMap<String, Cell>,
}

impl Record {
    /// Build a record from cells aligned with `columns`.
    ///
    /// Missing trailing cells are treated as empty. A stored
    /// `Global_384_Position` value is dropped; it is always recomputed.
    pub fn from_cells(columns: &[String], cells: Vec<Cell>) -> Self {
        let mut record = Record::default();
        let mut cells = cells.into_iter();

        for column in columns {
            let cell = cells.next().unwrap_or_default();
            match column.as_str() {
                PLATE_COLUMN => record.plate = cell.to_number(),
                WELL_96_COLUMN => record.well_96 = cell.to_label(),
                WELL_384_COLUMN => record.well_384 = cell.to_label(),
                POSITION_COLUMN => {}
                _ => {
                    record.extra.insert(column.clone(), cell);
                }
            }
        }

        record
    }

    /// Value of a column, typed fields included.
    pub fn cell(&self, column: &str) -> Cell {
        match column {
            PLATE_COLUMN => self.plate.into(),
            WELL_96_COLUMN => self.well_96.as_deref().into(),
            WELL_384_COLUMN => self.well_384.as_deref().into(),
            POSITION_COLUMN => self.global_384_position.map(|p| p as f64).into(),
            _ => self.extra.get(column).cloned().unwrap_or_default(),
        }
    }

    /// A record is sortable when Plate, 96 Well and 384 Well are all present.
    pub fn is_sortable(&self) -> bool {
        self.plate.is_some() && self.well_96.is_some() && self.well_384.is_some()
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Ordered records and the ordered column list they are exported with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Build a dataset from a header row and raw data rows.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let records = rows
            .into_iter()
            .map(|cells| Record::from_cells(&columns, cells))
            .collect();
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Number of records with all three key fields present.
    pub fn sortable_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_sortable()).count()
    }

    /// Cells of every record, in column order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Cell>> + '_ {
        self.records
            .iter()
            .map(|record| self.columns.iter().map(|c| record.cell(c)).collect())
    }
}

// =============================================================================
// View Mode
// =============================================================================

/// Ordering applied to the sortable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum ViewMode {
    /// Plate, then 96-well row letter, then column.
    #[default]
    #[serde(rename = "96-well layout")]
    #[value(name = "96", alias = "96-well")]
    Layout96,
    /// Global 384-well position.
    #[serde(rename = "384-well layout")]
    #[value(name = "384", alias = "384-well")]
    Layout384,
}

impl ViewMode {
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Layout96 => "96-well layout",
            ViewMode::Layout384 => "384-well layout",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "96" | "96-well" | "96-well layout" => Ok(ViewMode::Layout96),
            "384" | "384-well" | "384-well layout" => Ok(ViewMode::Layout384),
            other => Err(format!("Unknown view mode: {}", other)),
        }
    }
}

// =============================================================================
// File Format
// =============================================================================

/// Spreadsheet format accepted on input and produced on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    #[default]
    Xlsx,
}

impl FileFormat {
    /// Format implied by a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv; charset=utf-8",
            FileFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            other => Err(other.to_string()),
        }
    }
}
