//! Result types returned by the extraction entry points.

use crate::deck::{Deck, ShapeKind};
use serde::{Deserialize, Serialize};

/// MIME type of the assembled Word document.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The rendered page of one qualifying slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideImage {
    /// 1-based slide number; the image is page `slide_number - 1` of the PDF.
    pub slide_number: usize,
    pub width: u32,
    pub height: u32,
    /// RGB PNG bytes.
    #[serde(skip)]
    pub png: Vec<u8>,
}

/// Result of a full extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Ascending numbers of the slides carrying at least one visual shape.
    pub visual_slides: Vec<usize>,
    /// One image per rendered slide, ascending slide order.
    pub images: Vec<SlideImage>,
    /// The assembled `.docx`; `None` when no slide qualified.
    #[serde(skip)]
    pub document: Option<Vec<u8>>,
    pub summary: DeckSummary,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// True when at least one slide qualified and was rendered.
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// Counters and timings for one extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Slides in the deck.
    pub total_slides: usize,
    /// Slides covered by the selection.
    pub selected_slides: usize,
    /// Slides carrying at least one visual shape.
    pub visual_slides: usize,
    /// Slide images produced.
    pub rendered_slides: usize,
    /// Qualifying slides with no page in the converted PDF.
    pub skipped_slides: Vec<usize>,
    /// Pages in the converted PDF (0 when no slide was rendered).
    pub pdf_pages: usize,
    pub deck_bytes: usize,
    pub pdf_bytes: usize,
    pub document_bytes: usize,
    pub conversion_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Per-slide overview used by `inspect` and the `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideSummary {
    pub number: usize,
    pub hidden: bool,
    /// Kinds of the top-level shapes, in document order.
    pub shape_kinds: Vec<ShapeKind>,
    /// Whether the slide is selected and carries at least one visual shape.
    pub visual: bool,
}

/// Shape inventory of a deck, produced without contacting the conversion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSummary {
    pub slide_count: usize,
    pub visual_kinds: Vec<ShapeKind>,
    pub visual_slides: Vec<usize>,
    pub slides: Vec<SlideSummary>,
}

impl DeckSummary {
    /// Summarise `deck` against the given visual kinds.
    ///
    /// `visual_slides` is passed in rather than recomputed so the summary
    /// agrees with the slide selection that produced it.
    pub fn new(deck: &Deck, visual_kinds: &[ShapeKind], visual_slides: &[usize]) -> Self {
        let slides = deck
            .slides
            .iter()
            .map(|s| SlideSummary {
                number: s.number,
                hidden: s.hidden,
                shape_kinds: s.shapes.iter().map(|sh| sh.kind).collect(),
                visual: visual_slides.contains(&s.number),
            })
            .collect();

        DeckSummary {
            slide_count: deck.slide_count(),
            visual_kinds: visual_kinds.to_vec(),
            visual_slides: visual_slides.to_vec(),
            slides,
        }
    }
}
