//! REST API types.
//!
//! Datasets travel as a column list plus row arrays so column order survives
//! JSON serialization.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{PipelineError, ServerError};
use crate::models::{Cell, Dataset, ViewMode};
use crate::parser::RawSheet;
use crate::transform::pipeline::{ConvertResult, ConvertStats, SheetInfo};

/// Response to `/api/convert`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub job_id: String,

    /// "ready" or "warning" (some sortable rows could not be fully keyed)
    pub status: String,

    pub mode: ViewMode,

    pub columns: Vec<String>,

    /// Rows in the new order, cells aligned with `columns`
    pub rows: Vec<Vec<Cell>>,

    pub metadata: ConvertMetadata,
}

/// Metadata about a conversion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertMetadata {
    pub header_row: usize,
    pub header_detected: bool,
    pub sheet: SheetInfo,
    pub stats: ConvertStats,
    pub processed_at: DateTime<Utc>,
}

impl From<ConvertResult> for ConvertResponse {
    fn from(result: ConvertResult) -> Self {
        let stats = result.stats;
        let needs_attention = match result.mode {
            ViewMode::Layout96 => stats.unrecognized_96 > 0,
            ViewMode::Layout384 => stats.unpositioned > 0,
        };

        let (columns, rows) = split_dataset(&result.dataset);

        ConvertResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if needs_attention { "warning" } else { "ready" }.to_string(),
            mode: result.mode,
            columns,
            rows,
            metadata: ConvertMetadata {
                header_row: result.header_row,
                header_detected: result.header_detected,
                sheet: result.sheet_info,
                stats,
                processed_at: Utc::now(),
            },
        }
    }
}

fn split_dataset(dataset: &Dataset) -> (Vec<String>, Vec<Vec<Cell>>) {
    (dataset.columns.clone(), dataset.rows().collect())
}

/// Response to `/api/preview`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// First rows of the raw grid, header not applied
    pub rows: Vec<Vec<Cell>>,
    pub total_rows: usize,
    pub detected_header_row: Option<usize>,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
}

impl PreviewResponse {
    pub fn new(sheet: &RawSheet, preview_rows: usize, scan_rows: usize) -> Self {
        Self {
            rows: sheet.preview(preview_rows).to_vec(),
            total_rows: sheet.rows.len(),
            detected_header_row: sheet.find_header_row(scan_rows),
            encoding: sheet.encoding.clone(),
            delimiter: sheet.delimiter.map(|d| d.to_string()),
        }
    }
}

/// Multipart fields accepted by `/api/convert` and `/api/export`.
#[derive(Debug, Clone, Default)]
pub struct ConvertForm {
    pub mode: Option<String>,
    pub header_row: Option<String>,
    pub format: Option<String>,
    pub delimiter: Option<String>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "columns": [],
        "rows": []
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pipeline(e) => match e {
                PipelineError::Parse(_) => StatusCode::BAD_REQUEST,
                PipelineError::Validation(_) | PipelineError::EmptyInput => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PipelineError::Sort(_) | PipelineError::Export(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // Report the innermost message, not the layer prefixes
        let message = match &self {
            ServerError::Pipeline(PipelineError::Validation(e)) => e.to_string(),
            ServerError::Pipeline(PipelineError::Parse(e)) => e.to_string(),
            other => other.to_string(),
        };
        (self.status_code(), Json(error_response(&message))).into_response()
    }
}
