//! # slide-visuals
//!
//! Pull the slides that carry pictures, tables, charts, groups or drawn
//! shapes out of a PowerPoint deck and bundle them into a Word document.
//!
//! Text-only slides are rarely what a reader wants to see again; the visual
//! ones are. This crate reads the `.pptx` package directly to find them, has
//! the deck converted to PDF by a remote conversion service, renders just the
//! qualifying pages, and lays them out one per heading in a `.docx`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PPTX
//!  │
//!  ├─ 1. Input     read a local file or download from URL (kept in memory)
//!  ├─ 2. Deck      parse slide order and classify every top-level shape
//!  ├─ 3. Detect    slides with ≥1 picture / table / chart / group / auto shape / freeform
//!  ├─ 4. Convert   POST the deck to the conversion service → PDF
//!  ├─ 5. Render    rasterise page (slide − 1) via pdfium (spawn_blocking)
//!  ├─ 6. Encode    RGB PNG per slide
//!  └─ 7. Assemble  DOCX: title heading, then "Slide N" heading + picture per slide
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slide_visuals::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let output = extract("quarterly.pptx", &config).await?;
//!     println!("Slides with visual elements: {:?}", output.visual_slides);
//!     if let Some(docx) = output.document {
//!         std::fs::write("slides_with_visual_elements.docx", docx)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `slide-visuals` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Browser upload form and HTTP API (axum) |
//!
//! Disable both when using only the library:
//! ```toml
//! slide-visuals = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Rendering needs the pdfium shared library at run time. It is looked up in
//! `ExtractionConfig::pdfium_lib_path`, then `PDFIUM_LIB_PATH`, then the
//! working directory, then the system library path. Pre-built binaries:
//! <https://github.com/bblanchon/pdfium-binaries/releases>.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod deck;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, SlideSelection, DEFAULT_DOCUMENT_TITLE,
    DEFAULT_OUTPUT_FILE_NAME, DEFAULT_SERVICE_URL,
};
pub use deck::{Deck, Shape, ShapeKind, Slide, DEFAULT_VISUAL_KINDS};
pub use error::SlideVisualsError;
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_file, inspect, inspect_with_config,
    write_atomic,
};
pub use output::{DeckSummary, ExtractionOutput, ExtractionStats, SlideImage, SlideSummary, DOCX_MIME};
pub use pipeline::convert::{DeckConverter, HttpConverter};
pub use pipeline::render::{PageRenderer, PdfiumRenderer, RenderedPages};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
