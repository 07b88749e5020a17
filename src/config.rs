//! Configuration types for slide extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The CLI, the web server and library
//! callers all funnel into the same struct, so one run can be reproduced by
//! another surface just by copying its config.

use crate::deck::{ShapeKind, DEFAULT_VISUAL_KINDS};
use crate::error::SlideVisualsError;
use crate::pipeline::convert::DeckConverter;
use crate::pipeline::render::PageRenderer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Endpoint of the hosted PPTX → PDF conversion function.
pub const DEFAULT_SERVICE_URL: &str = "https://doc2pdf.azurewebsites.net/api/HttpTrigger1";

/// Heading written at the top of the assembled document.
pub const DEFAULT_DOCUMENT_TITLE: &str = "Slides with Visual Elements";

/// File name offered for the assembled document.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "slides_with_visual_elements.docx";

/// Configuration for one deck extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use slide_visuals::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(144)
///     .image_width_inches(5.5)
///     .service_url("http://localhost:7071/api/convert")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Conversion service endpoint. Default: [`DEFAULT_SERVICE_URL`].
    pub service_url: String,

    /// Timeout for the conversion request in seconds. Default: 120.
    ///
    /// Office-to-PDF conversion on a cold serverless worker easily takes
    /// half a minute for a large deck.
    pub conversion_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Rendering DPI for each slide page. Range: 72–400. Default: 72.
    ///
    /// A 10 × 7.5 in slide comes out at 720 × 540 px at 72 DPI, which is
    /// plenty for a 6 in wide picture in a Word document. Raise it when the
    /// images are meant to be zoomed or printed.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps either dimension regardless of DPI, scaling the other
    /// proportionally.
    pub max_rendered_pixels: u32,

    /// Width of each picture in the assembled document, in inches. Default: 6.0.
    pub image_width_inches: f32,

    /// Level-1 heading of the assembled document.
    pub document_title: String,

    /// Shape kinds that make a slide qualify. Default: [`DEFAULT_VISUAL_KINDS`].
    pub visual_kinds: Vec<ShapeKind>,

    /// Which slides to consider. Default: all slides.
    pub slides: SlideSelection,

    /// Explicit pdfium library to bind to. Falls back to `PDFIUM_LIB_PATH`,
    /// then the working directory, then the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Pre-constructed conversion backend. Takes precedence over `service_url`.
    pub converter: Option<Arc<dyn DeckConverter>>,

    /// Pre-constructed page renderer. Takes precedence over pdfium.
    pub renderer: Option<Arc<dyn PageRenderer>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            conversion_timeout_secs: 120,
            download_timeout_secs: 120,
            dpi: 72,
            max_rendered_pixels: 2000,
            image_width_inches: 6.0,
            document_title: DEFAULT_DOCUMENT_TITLE.to_string(),
            visual_kinds: DEFAULT_VISUAL_KINDS.to_vec(),
            slides: SlideSelection::default(),
            pdfium_lib_path: None,
            converter: None,
            renderer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("service_url", &self.service_url)
            .field("conversion_timeout_secs", &self.conversion_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("image_width_inches", &self.image_width_inches)
            .field("document_title", &self.document_title)
            .field("visual_kinds", &self.visual_kinds)
            .field("slides", &self.slides)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("converter", &self.converter.as_ref().map(|_| "<dyn DeckConverter>"))
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PageRenderer>"))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.config.service_url = url.into();
        self
    }

    pub fn conversion_timeout_secs(mut self, secs: u64) -> Self {
        self.config.conversion_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn image_width_inches(mut self, inches: f32) -> Self {
        self.config.image_width_inches = inches;
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.config.document_title = title.into();
        self
    }

    pub fn visual_kinds(mut self, kinds: impl IntoIterator<Item = ShapeKind>) -> Self {
        let mut kinds: Vec<ShapeKind> = kinds.into_iter().collect();
        kinds.sort_unstable();
        kinds.dedup();
        self.config.visual_kinds = kinds;
        self
    }

    pub fn slides(mut self, selection: SlideSelection) -> Self {
        self.config.slides = selection;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn converter(mut self, converter: Arc<dyn DeckConverter>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, SlideVisualsError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(SlideVisualsError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if !(c.image_width_inches > 0.0 && c.image_width_inches <= 20.0) {
            return Err(SlideVisualsError::InvalidConfig(format!(
                "Image width must be within (0, 20] inches, got {}",
                c.image_width_inches
            )));
        }
        if c.visual_kinds.is_empty() {
            return Err(SlideVisualsError::InvalidConfig(
                "At least one visual shape kind is required".into(),
            ));
        }
        if c.converter.is_none()
            && !(c.service_url.starts_with("http://") || c.service_url.starts_with("https://"))
        {
            return Err(SlideVisualsError::InvalidConfig(format!(
                "Conversion service URL must be http(s), got '{}'",
                c.service_url
            )));
        }
        if c.conversion_timeout_secs == 0 {
            return Err(SlideVisualsError::InvalidConfig(
                "Conversion timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which slides of the deck are considered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideSelection {
    /// Consider all slides (default).
    #[default]
    All,
    /// A single slide (1-indexed).
    Single(usize),
    /// A contiguous range of slides (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific slides (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl SlideSelection {
    /// Expand the selection into a sorted, deduplicated list of 1-based slide numbers.
    pub fn to_numbers(&self, total_slides: usize) -> Vec<usize> {
        let mut numbers: Vec<usize> = match self {
            SlideSelection::All => (1..=total_slides).collect(),
            SlideSelection::Single(n) => {
                if *n >= 1 && *n <= total_slides {
                    vec![*n]
                } else {
                    vec![]
                }
            }
            SlideSelection::Range(start, end) => {
                let s = (*start).max(1);
                let e = (*end).min(total_slides);
                (s..=e).collect()
            }
            SlideSelection::Set(slides) => slides
                .iter()
                .copied()
                .filter(|&n| n >= 1 && n <= total_slides)
                .collect(),
        };
        numbers.sort_unstable();
        numbers.dedup();
        numbers
    }

    /// Whether slide `number` (1-based) is selected.
    pub fn contains(&self, number: usize) -> bool {
        match self {
            SlideSelection::All => number >= 1,
            SlideSelection::Single(n) => number == *n,
            SlideSelection::Range(start, end) => number >= (*start).max(1) && number <= *end,
            SlideSelection::Set(slides) => slides.contains(&number),
        }
    }
}
