//! Browser front-end and HTTP API (feature `server`).
//!
//! | Route | Method | Purpose |
//! |---|---|---|
//! | `/` | GET | upload form |
//! | `/extract` | POST | multipart upload (`deck` field) → HTML preview + `.docx` download link |
//! | `/api/extract` | POST | raw deck body → `.docx` attachment, `204` when no slide qualifies |
//! | `/health` | GET | liveness check |
//!
//! Every request works on its own in-memory buffers; nothing is written to
//! disk, so concurrent uploads never see each other's files.

use crate::config::{ExtractionConfig, DEFAULT_OUTPUT_FILE_NAME};
use crate::error::SlideVisualsError;
use crate::extract::extract_from_bytes;
use crate::output::{ExtractionOutput, DOCX_MIME};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::escape::escape;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Default cap on uploaded deck size.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Header carrying the qualifying slide numbers on `/api/extract` responses.
pub const VISUAL_SLIDES_HEADER: &str = "x-visual-slides";

/// Optional request header naming the uploaded file on `/api/extract`.
pub const FILE_NAME_HEADER: &str = "x-file-name";

const PAGE_TITLE: &str = "PowerPoint Visual Elements Extractor (Images, Flowdiagrams, Tables, ...)";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ExtractionConfig>,
}

/// Build the router with every route and layer.
pub fn router(config: ExtractionConfig, max_upload_bytes: usize) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(index))
        .route("/extract", post(extract_form))
        .route("/api/extract", post(extract_api))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(
    addr: SocketAddr,
    config: ExtractionConfig,
    max_upload_bytes: usize,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(config, max_upload_bytes)).await
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

async fn index() -> Html<String> {
    Html(page(&upload_form()))
}

async fn extract_form(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Bytes)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("deck") {
                    continue;
                }
                let name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("upload.pptx")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((name, bytes)),
                    Err(e) => return html_error(e.status(), &e.body_text()),
                }
                break;
            }
            Ok(None) => break,
            Err(e) => return html_error(e.status(), &e.body_text()),
        }
    }

    let Some((name, bytes)) = upload else {
        return html_error(
            StatusCode::BAD_REQUEST,
            "Upload a PowerPoint file in the 'deck' field.",
        );
    };

    info!("Upload '{}' ({} bytes)", name, bytes.len());
    match extract_from_bytes(bytes.to_vec(), &name, &state.config).await {
        Ok(output) => Html(page(&result_section(&name, &output))).into_response(),
        Err(e) => {
            warn!("Extraction of '{}' failed: {}", name, e);
            html_error(status_for(&e), &e.to_string())
        }
    }
}

async fn extract_api(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload.pptx")
        .to_string();

    let output = match extract_from_bytes(body.to_vec(), &name, &state.config).await {
        Ok(output) => output,
        Err(e) => {
            warn!("Extraction of '{}' failed: {}", name, e);
            return ApiError(e).into_response();
        }
    };

    let slides = output
        .visual_slides
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let slides_header = HeaderValue::from_str(&slides).unwrap_or(HeaderValue::from_static(""));

    match output.document {
        Some(document) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_MIME)),
                (
                    header::CONTENT_DISPOSITION,
                    HeaderValue::from_static(
                        "attachment; filename=\"slides_with_visual_elements.docx\"",
                    ),
                ),
                (header::HeaderName::from_static(VISUAL_SLIDES_HEADER), slides_header),
            ],
            document,
        )
            .into_response(),
        None => (
            StatusCode::NO_CONTENT,
            [(header::HeaderName::from_static(VISUAL_SLIDES_HEADER), slides_header)],
        )
            .into_response(),
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// HTTP status for a failed extraction.
pub fn status_for(err: &SlideVisualsError) -> StatusCode {
    match err {
        SlideVisualsError::ConversionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_conversion_error() => StatusCode::BAD_GATEWAY,
        SlideVisualsError::NotAPresentation { .. } | SlideVisualsError::InvalidInput { .. } => {
            StatusCode::BAD_REQUEST
        }
        SlideVisualsError::CorruptPresentation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    /// Status code returned by the conversion service, when it answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
}

struct ApiError(SlideVisualsError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let upstream_status = match &self.0 {
            SlideVisualsError::ConversionFailed { status, .. } => Some(*status),
            _ => None,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            status: status.as_u16(),
            upstream_status,
        };
        (status, Json(body)).into_response()
    }
}

fn html_error(status: StatusCode, message: &str) -> Response {
    let headline = if status == StatusCode::BAD_GATEWAY || status == StatusCode::GATEWAY_TIMEOUT {
        "<p><strong>PPT to PDF conversion failed.</strong></p>"
    } else {
        ""
    };
    let body = format!(
        "<div class=\"error\">{headline}<pre>{}</pre></div>{}",
        escape(message),
        back_link()
    );
    (status, Html(page(&body))).into_response()
}

// ── HTML ─────────────────────────────────────────────────────────────────

fn page(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; }}
figure {{ margin: 1.5rem 0; }}
figure img {{ width: 100%; border: 1px solid #ddd; }}
figcaption {{ color: #555; text-align: center; }}
.success {{ color: #1b5e20; }}
.error {{ color: #b71c1c; }}
</style>
</head>
<body>
<h1>{title}</h1>
{content}
</body>
</html>
"#,
        title = PAGE_TITLE,
        content = content,
    )
}

fn upload_form() -> String {
    format!(
        r#"<form method="post" action="/extract" enctype="multipart/form-data">
<label for="deck">Upload a PowerPoint file</label>
<input id="deck" type="file" name="deck" accept=".pptx,{mime}" required>
<button type="submit">Extract</button>
</form>"#,
        mime = crate::pipeline::convert::PPTX_MIME,
    )
}

fn back_link() -> &'static str {
    r#"<p><a href="/">Upload another file</a></p>"#
}

fn result_section(name: &str, output: &ExtractionOutput) -> String {
    let mut html = String::new();
    html.push_str(&format!("<p>File: {}</p>", escape(name)));

    html.push_str("<p class=\"success\">PPT to PDF conversion successful!</p>");
    if output.visual_slides.is_empty() {
        html.push_str("<p>No slides with visual elements found.</p>");
        html.push_str(back_link());
        return html;
    }

    html.push_str(&format!(
        "<p>Slides with visual elements: {:?}</p>",
        output.visual_slides
    ));
    if !output.stats.skipped_slides.is_empty() {
        html.push_str(&format!(
            "<p class=\"error\">No page in the converted PDF for slides {:?}</p>",
            output.stats.skipped_slides
        ));
    }

    for image in &output.images {
        html.push_str(&format!(
            "<figure><img src=\"data:image/png;base64,{}\" alt=\"Slide {n}\"><figcaption>Slide {n}</figcaption></figure>",
            STANDARD.encode(&image.png),
            n = image.slide_number,
        ));
    }

    if let Some(ref document) = output.document {
        html.push_str(&format!(
            "<p><a download=\"{file}\" href=\"data:{mime};base64,{data}\">Download Word Document</a></p>",
            file = DEFAULT_OUTPUT_FILE_NAME,
            mime = DOCX_MIME,
            data = STANDARD.encode(document),
        ));
    }
    html.push_str(back_link());
    html
}
