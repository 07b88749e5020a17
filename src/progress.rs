//! Progress-callback trait for extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline detects, converts and renders slides.
//!
//! # Example
//!
//! ```rust
//! use slide_visuals::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_slide_rendered(&self, slide_number: usize, total: usize, png_len: usize) {
//!         let done = self.rendered.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("Slide {slide_number} ({done}/{total}, {png_len} bytes)");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { rendered: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it moves through a deck.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Slides are rendered on the blocking pool but events
/// are always delivered from the task driving the extraction, in slide order.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the deck is parsed.
    ///
    /// # Arguments
    /// * `selected_slides`: number of slides the selection covers
    fn on_extraction_start(&self, selected_slides: usize) {
        let _ = selected_slides;
    }

    /// Called once the visual slides are known, before any network call.
    ///
    /// # Arguments
    /// * `visual_slides`: ascending 1-based numbers of qualifying slides
    fn on_slides_detected(&self, visual_slides: &[usize]) {
        let _ = visual_slides;
    }

    /// Called when the conversion service has returned the PDF.
    ///
    /// # Arguments
    /// * `pdf_len`: size of the converted PDF in bytes
    /// * `elapsed_ms`: round-trip time of the conversion request
    fn on_conversion_complete(&self, pdf_len: usize, elapsed_ms: u64) {
        let _ = (pdf_len, elapsed_ms);
    }

    /// Called for each slide whose page was rendered and encoded.
    ///
    /// # Arguments
    /// * `slide_number`: 1-indexed slide number
    /// * `total`: number of qualifying slides
    /// * `png_len`: byte length of the encoded PNG
    fn on_slide_rendered(&self, slide_number: usize, total: usize, png_len: usize) {
        let _ = (slide_number, total, png_len);
    }

    /// Called for a qualifying slide that has no page in the converted PDF.
    fn on_slide_skipped(&self, slide_number: usize, reason: &str) {
        let _ = (slide_number, reason);
    }

    /// Called once at the end of a successful extraction.
    ///
    /// # Arguments
    /// * `visual_slides`: number of qualifying slides
    /// * `rendered`: number of slide images produced
    fn on_extraction_complete(&self, visual_slides: usize, rendered: usize) {
        let _ = (visual_slides, rendered);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
