//! # Platemap - 96 ⇄ 384 well plate layout toggler
//!
//! Platemap reorders plate layout spreadsheets exported from lab instruments
//! either by 96-well layout (Plate, then well A1..H12) or by global 384-well
//! position, leaving incomplete rows exactly where they were.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│  Transform  │────▶│   Export    │
//! │   upload    │     │ (header row)│     │ (pos + sort)│     │ (CSV/XLSX)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use platemap::{convert_file, export, ConvertOptions, FileFormat, ViewMode};
//!
//! let options = ConvertOptions { mode: ViewMode::Layout384, ..Default::default() };
//! let result = convert_file("plates.csv", &options)?;
//! export::write_file(&result.dataset, "sorted_plate_layout.xlsx", FileFormat::Xlsx)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Cell, Record, Dataset, ViewMode
//! - [`parser`] - CSV / XLSX loading and header detection
//! - [`validation`] - Required column checks
//! - [`transform`] - Global positions, sorting and the pipeline
//! - [`export`] - CSV / XLSX output
//! - [`config`] - Environment settings
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Loading
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Output
pub mod export;

// Settings
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ExportError, ParseError, PipelineError, ServerError, SortError, ValidationError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Dataset, FileFormat, Record, ViewMode, REQUIRED_COLUMNS};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{find_header_row, parse_bytes, parse_file, RawSheet};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    assign_global_positions, global_384_position, plate_group, plates_in_group, sort_by_view_mode, well_384_index, Well96Key,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert_bytes, convert_dataset, convert_file, ConvertOptions, ConvertResult, ConvertStats,
    SheetInfo,
};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::Settings;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
