//! HTTP Server for the platemap API.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                               |
//! |--------|----------------|-------------------------------------------|
//! | GET    | `/health`      | Health check                              |
//! | POST   | `/api/preview` | Raw grid preview and header row guess     |
//! | POST   | `/api/convert` | Convert and return rows as JSON           |
//! | POST   | `/api/export`  | Convert and download as CSV or XLSX       |
//! | GET    | `/api/logs`    | SSE stream for real-time logs             |
//!
//! Upload endpoints take a multipart form with a `file` field plus optional
//! `mode` (`96` / `384`), `headerRow`, `delimiter` and, for export, `format`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::Path, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{ConvertForm, ConvertResponse, PreviewResponse};
use crate::config::Settings;
use crate::error::{ServerError, ServerResult};
use crate::export::{default_file_name, to_bytes};
use crate::models::FileFormat;
use crate::parser::parse_bytes;
use crate::transform::pipeline::{convert_bytes, ConvertOptions, ConvertResult};

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// An uploaded file with its form fields.
struct Upload {
    bytes: Vec<u8>,
    file_name: Option<String>,
    form: ConvertForm,
}

impl Upload {
    /// Input format from the file name, else sniffed (XLSX files are zip archives).
    fn format(&self) -> FileFormat {
        self.file_name
            .as_deref()
            .and_then(|name| FileFormat::from_path(Path::new(name)))
            .unwrap_or_else(|| {
                if self.bytes.starts_with(b"PK\x03\x04") {
                    FileFormat::Xlsx
                } else {
                    FileFormat::Csv
                }
            })
    }

    fn options(&self, settings: &Settings) -> ServerResult<ConvertOptions> {
        let form = &self.form;
        let mode = match form.mode.as_deref() {
            Some(m) => m.parse().map_err(ServerError::BadRequest)?,
            None => settings.default_mode,
        };
        let header_row = form
            .header_row
            .as_deref()
            .map(|r| {
                r.trim()
                    .parse::<usize>()
                    .map_err(|_| ServerError::BadRequest(format!("Invalid headerRow: {}", r)))
            })
            .transpose()?;
        let delimiter = form.delimiter.as_deref().map(parse_delimiter).transpose()?;

        Ok(ConvertOptions {
            mode,
            header_row,
            header_scan_rows: settings.header_scan_rows,
            format: Some(self.format()),
            delimiter,
        })
    }

    /// Export format from the form, XLSX by default.
    fn output_format(&self) -> ServerResult<FileFormat> {
        match self.form.format.as_deref() {
            Some(f) => f
                .parse()
                .map_err(|e| ServerError::BadRequest(format!("Unsupported export format: {}", e))),
            None => Ok(FileFormat::Xlsx),
        }
    }
}

fn parse_delimiter(raw: &str) -> ServerResult<char> {
    if raw.eq_ignore_ascii_case("tab") || raw == "\\t" {
        return Ok('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ServerError::BadRequest(format!("Invalid delimiter: {:?}", raw))),
    }
}

/// Build the application router
pub fn router(settings: Settings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/preview", post(preview))
        .route("/api/convert", post(convert))
        .route("/api/export", post(export))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(settings)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let port = settings.port;
    let app = router(settings);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Platemap server running on http://localhost:{}", port);
    println!("   POST /api/preview - Preview upload and detect header row");
    println!("   POST /api/convert - Convert upload to JSON rows");
    println!("   POST /api/export  - Convert upload and download CSV/XLSX");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "platemap",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "preview": "POST /api/preview",
            "convert": "POST /api/convert",
            "export": "POST /api/export",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // Lagged receivers skip what they missed
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Read the multipart form
async fn read_upload(mut multipart: Multipart) -> ServerResult<Upload> {
    let mut bytes = None;
    let mut file_name = None;
    let mut form = ConvertForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            file_name = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            bytes = Some(data.to_vec());
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
        let value = Some(value).filter(|v| !v.is_empty());

        match name.as_str() {
            "mode" => form.mode = value,
            "headerRow" => form.header_row = value,
            "format" => form.format = value,
            "delimiter" => form.delimiter = value,
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    Ok(Upload { bytes, file_name, form })
}

/// Run the synchronous pipeline off the async runtime
async fn run_conversion(upload: Upload, settings: &Settings) -> ServerResult<ConvertResult> {
    let options = upload.options(settings)?;
    let format = options.format.unwrap_or_default();

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW UPLOAD: {} ({} bytes, {})",
        upload.file_name.as_deref().unwrap_or("unknown"),
        upload.bytes.len(),
        options.mode
    );
    println!("{}\n", "=".repeat(70));

    tokio::task::spawn_blocking(move || convert_bytes(&upload.bytes, format, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(|e| {
            log_error(e.to_string());
            ServerError::from(e)
        })
}

/// Preview endpoint
async fn preview(
    State(settings): State<Settings>,
    multipart: Multipart,
) -> ServerResult<Json<PreviewResponse>> {
    let upload = read_upload(multipart).await?;
    let delimiter = upload.form.delimiter.as_deref().map(parse_delimiter).transpose()?;
    let sheet = parse_bytes(&upload.bytes, upload.format(), delimiter)
        .map_err(|e| ServerError::Pipeline(e.into()))?;

    Ok(Json(PreviewResponse::new(
        &sheet,
        settings.preview_rows,
        settings.header_scan_rows,
    )))
}

/// Convert endpoint
async fn convert(
    State(settings): State<Settings>,
    multipart: Multipart,
) -> ServerResult<Json<ConvertResponse>> {
    let upload = read_upload(multipart).await?;
    let result = run_conversion(upload, &settings).await?;
    Ok(Json(ConvertResponse::from(result)))
}

/// Export endpoint
async fn export(
    State(settings): State<Settings>,
    multipart: Multipart,
) -> ServerResult<impl IntoResponse> {
    let upload = read_upload(multipart).await?;
    let output_format = upload.output_format()?;
    let result = run_conversion(upload, &settings).await?;

    let bytes = to_bytes(&result.dataset, output_format)
        .map_err(|e| ServerError::Pipeline(e.into()))?;

    let headers = [
        (header::CONTENT_TYPE, output_format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", default_file_name(output_format)),
        ),
    ];

    Ok((headers, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViewMode;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "platemap-test-boundary";
    const LAYOUT_CSV: &str = "Sample,Plate,96 Well,384 Well\nb,5,A1,A1\ngap,,A1,A1\na,1,A2,A2\n";

    /// Multipart body with a `file` part followed by plain text fields.
    fn multipart_body(file_name: &str, content: &str, fields: &[(&str, &str)]) -> String {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n",
            b = BOUNDARY,
            f = file_name,
            c = content
        );
        for (name, value) in fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        body
    }

    fn upload_request(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_export_endpoint_returns_csv_download() {
        let body = multipart_body("plates.csv", LAYOUT_CSV, &[("mode", "384"), ("format", "csv")]);
        let response = router(Settings::default())
            .oneshot(upload_request("/api/export", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"sorted_plate_layout.csv\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Sample,Plate,96 Well,384 Well,Global_384_Position");
        assert_eq!(lines[1], "a,1,A2,A2,2");
        assert_eq!(lines[2], "gap,,A1,A1,");
        assert_eq!(lines[3], "b,5,A1,A1,385");
    }

    #[tokio::test]
    async fn test_convert_endpoint_returns_rows() {
        let body = multipart_body("plates.csv", LAYOUT_CSV, &[]);
        let response = router(Settings::default())
            .oneshot(upload_request("/api/convert", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["mode"], "96-well layout");
        assert_eq!(json["rows"][0][0], "a");
        assert_eq!(json["rows"][1][0], "gap");
    }

    #[tokio::test]
    async fn test_convert_endpoint_rejects_missing_columns() {
        let body = multipart_body("plates.csv", "Sample,Plate\na,1\n", &[]);
        let response = router(Settings::default())
            .oneshot(upload_request("/api/convert", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "error");
    }

    fn upload(file_name: Option<&str>, bytes: &[u8], form: ConvertForm) -> Upload {
        Upload {
            bytes: bytes.to_vec(),
            file_name: file_name.map(str::to_string),
            form,
        }
    }

    #[test]
    fn test_format_from_name_or_content() {
        assert_eq!(upload(Some("a.csv"), b"x", ConvertForm::default()).format(), FileFormat::Csv);
        assert_eq!(upload(Some("a.XLSX"), b"x", ConvertForm::default()).format(), FileFormat::Xlsx);
        assert_eq!(upload(None, b"PK\x03\x04rest", ConvertForm::default()).format(), FileFormat::Xlsx);
        assert_eq!(upload(None, b"Plate,96 Well", ConvertForm::default()).format(), FileFormat::Csv);
    }

    #[test]
    fn test_options_from_form() {
        let form = ConvertForm {
            mode: Some("384".into()),
            header_row: Some("3".into()),
            format: None,
            delimiter: Some("tab".into()),
        };
        let options = upload(Some("a.csv"), b"", form).options(&Settings::default()).unwrap();

        assert_eq!(options.mode, ViewMode::Layout384);
        assert_eq!(options.header_row, Some(3));
        assert_eq!(options.delimiter, Some('\t'));
        assert_eq!(options.format, Some(FileFormat::Csv));
    }

    #[test]
    fn test_options_defaults_from_settings() {
        let settings = Settings { default_mode: ViewMode::Layout384, header_scan_rows: 7, ..Settings::default() };
        let options = upload(Some("a.csv"), b"", ConvertForm::default()).options(&settings).unwrap();

        assert_eq!(options.mode, ViewMode::Layout384);
        assert_eq!(options.header_row, None);
        assert_eq!(options.header_scan_rows, 7);
    }

    #[test]
    fn test_invalid_form_values() {
        let form = ConvertForm { mode: Some("1536".into()), ..Default::default() };
        assert!(upload(None, b"", form).options(&Settings::default()).is_err());

        let form = ConvertForm { header_row: Some("first".into()), ..Default::default() };
        assert!(upload(None, b"", form).options(&Settings::default()).is_err());

        let form = ConvertForm { format: Some("ods".into()), ..Default::default() };
        assert!(upload(None, b"", form).output_format().is_err());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";").unwrap(), ';');
        assert_eq!(parse_delimiter("TAB").unwrap(), '\t');
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
