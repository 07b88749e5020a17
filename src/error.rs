//! Error types for the slide-visuals library.
//!
//! Every failure is fatal for the extraction it belongs to: a deck either
//! yields its full set of slide images and the assembled document, or an
//! `Err(SlideVisualsError)` explaining what went wrong. Qualifying slides that
//! have no page in the converted PDF are the one soft case; they are reported
//! in [`crate::output::ExtractionStats::skipped_slides`] instead.
//!
//! The conversion service is the error path users hit most. A non-200 reply
//! surfaces as [`SlideVisualsError::ConversionFailed`] carrying both the
//! status code and the response text, so the message shown in the CLI or the
//! browser is the same one the service produced.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the slide-visuals library.
#[derive(Debug, Error)]
pub enum SlideVisualsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Slide deck not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a ZIP-based (PPTX) deck.
    #[error("'{name}' is not a PowerPoint (.pptx) file\nFirst bytes: {magic:?}")]
    NotAPresentation { name: String, magic: [u8; 4] },

    // ── Deck errors ───────────────────────────────────────────────────────
    /// The package opened but a required part is missing or malformed.
    #[error("Slide deck '{name}' is corrupt: {detail}")]
    CorruptPresentation { name: String, detail: String },

    // ── Conversion service errors ─────────────────────────────────────────
    /// The conversion service answered with a status other than 200.
    #[error("File conversion failed with status code: {status}\nResponse: {body}")]
    ConversionFailed { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connection reset …).
    #[error("Could not reach the conversion service at '{url}': {reason}")]
    ConversionRequestFailed { url: String, reason: String },

    /// The conversion service did not answer in time.
    #[error("Conversion service at '{url}' timed out after {secs}s\nIncrease --conversion-timeout.")]
    ConversionTimeout { url: String, secs: u64 },

    /// The service replied 200 but the payload is not a PDF.
    #[error("Conversion service returned something that is not a PDF\nFirst bytes: {magic:?}")]
    NotAPdf { magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The converted PDF cannot be opened by pdfium.
    #[error("Converted PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for slide {slide}: {detail}")]
    RasterisationFailed { slide: usize, detail: String },

    /// The rendered bitmap could not be written as PNG.
    #[error("PNG encoding failed for slide {slide}: {detail}")]
    ImageEncodingFailed { slide: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Building the Word document failed.
    #[error("Failed to assemble the Word document: {0}")]
    DocumentAssemblyFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Put libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SlideVisualsError {
    /// `true` for failures caused by the remote conversion service rather
    /// than by the deck or the local environment.
    pub fn is_conversion_error(&self) -> bool {
        matches!(
            self,
            Self::ConversionFailed { .. }
                | Self::ConversionRequestFailed { .. }
                | Self::ConversionTimeout { .. }
                | Self::NotAPdf { .. }
        )
    }
}
