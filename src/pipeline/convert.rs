//! Remote conversion: PPTX bytes in, PDF bytes out.
//!
//! The hosted service takes the raw deck as the request body. Because the
//! body is sent as `application/octet-stream`, the real MIME type travels in
//! the `Content-Type-Actual` header. A `200` carries the PDF; any other
//! status is a failed conversion whose status code and body are reported
//! back to the user unchanged. There is no retry.

use crate::error::SlideVisualsError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info, warn};

/// MIME type of a `.pptx` deck, sent in `Content-Type-Actual`.
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Header naming the real type of the octet-stream body (`Content-Type-Actual`).
pub const CONTENT_TYPE_ACTUAL: &str = "content-type-actual";

/// Turns a slide deck into a PDF with one page per slide.
///
/// [`HttpConverter`] talks to the hosted service; tests and embedders can
/// inject their own implementation through
/// [`crate::config::ExtractionConfigBuilder::converter`].
#[async_trait]
pub trait DeckConverter: Send + Sync {
    /// Convert `deck` (the bytes of `file_name`) to PDF bytes.
    async fn convert(&self, deck: &[u8], file_name: &str) -> Result<Vec<u8>, SlideVisualsError>;
}

/// Posts the deck to an HTTP conversion endpoint.
#[derive(Debug, Clone)]
pub struct HttpConverter {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl HttpConverter {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, SlideVisualsError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SlideVisualsError::ConversionRequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            url,
            timeout_secs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_error(&self, e: reqwest::Error) -> SlideVisualsError {
        if e.is_timeout() {
            SlideVisualsError::ConversionTimeout {
                url: self.url.clone(),
                secs: self.timeout_secs,
            }
        } else {
            SlideVisualsError::ConversionRequestFailed {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl DeckConverter for HttpConverter {
    async fn convert(&self, deck: &[u8], file_name: &str) -> Result<Vec<u8>, SlideVisualsError> {
        info!(
            "Converting '{}' ({} bytes) via {}",
            file_name,
            deck.len(),
            self.url
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        headers.insert(
            HeaderName::from_static(CONTENT_TYPE_ACTUAL),
            HeaderValue::from_static(PPTX_MIME),
        );

        let response = self
            .client
            .post(&self.url)
            .headers(headers)
            .body(deck.to_vec())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("<unreadable body: {e}>"),
            };
            warn!("Conversion service returned HTTP {}", status.as_u16());
            return Err(SlideVisualsError::ConversionFailed {
                status: status.as_u16(),
                body,
            });
        }

        let pdf = response
            .bytes()
            .await
            .map_err(|e| self.request_error(e))?
            .to_vec();
        check_pdf_magic(&pdf)?;

        debug!("Conversion returned {} bytes of PDF", pdf.len());
        Ok(pdf)
    }
}

/// A PDF starts with `%PDF`; anything else is an error page or garbage.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), SlideVisualsError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(SlideVisualsError::NotAPdf { magic })
}
