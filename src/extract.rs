//! Extraction entry points.
//!
//! Every surface (library, CLI, web UI) ends up in [`extract_deck`], which
//! runs the stages in this order:
//!
//! 1. parse the deck and classify its shapes,
//! 2. pick the visual slides,
//! 3. convert the deck to PDF through the conversion service (always, so a
//!    failing service is reported even for a deck with no visual slide),
//! 4. render and encode the page of every visual slide,
//! 5. assemble the Word document.
//!
//! Steps 4 and 5 are skipped when no slide qualifies.

use crate::config::ExtractionConfig;
use crate::deck::Deck;
use crate::error::SlideVisualsError;
use crate::output::{DeckSummary, ExtractionOutput, ExtractionStats, SlideImage};
use crate::pipeline::convert::{DeckConverter, HttpConverter};
use crate::pipeline::input::{self, DeckInput};
use crate::pipeline::render::{self, PageRenderer, PdfiumRenderer};
use crate::pipeline::{assemble, detect, encode};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract the slides with visual elements from a PPTX file or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`: Local file path or HTTP/HTTPS URL to a `.pptx`
/// * `config`: Extraction configuration
///
/// # Returns
/// `Ok(ExtractionOutput)` with one image per rendered slide and the
/// assembled document. When no slide qualifies the output has no images
/// and `document` is `None`.
///
/// # Errors
/// Any failure is fatal: unreadable input, a corrupt deck, a conversion
/// service answering anything but `200`, or a PDF pdfium cannot open.
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SlideVisualsError> {
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);
    let deck = input::resolve_input(input_str, config.download_timeout_secs).await?;
    extract_deck(deck, config).await
}

/// Extract from deck bytes already in memory (an upload, a database blob …).
///
/// `name` is used in error messages and passed to the converter.
///
/// # Example
/// ```rust,no_run
/// use slide_visuals::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("quarterly.pptx")?;
/// let output = extract_from_bytes(bytes, "quarterly.pptx", &ExtractionConfig::default()).await?;
/// println!("visual slides: {:?}", output.visual_slides);
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: impl Into<Vec<u8>>,
    name: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SlideVisualsError> {
    let bytes = bytes.into();
    input::check_zip_magic(&bytes, name)?;
    extract_deck(
        DeckInput {
            name: name.to_string(),
            bytes,
        },
        config,
    )
    .await
}

/// Extract and write the Word document to `output_path`.
///
/// The file is written to a temporary file in the destination directory and
/// then renamed over `output_path`, so readers never see a partial document.
/// When no slide qualifies nothing is written; check
/// [`ExtractionStats::rendered_slides`].
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, SlideVisualsError> {
    let mut output = extract(input_str, config).await?;
    let path = output_path.as_ref();

    match output.document.take() {
        Some(document) => {
            write_atomic(path, document).await?;
            info!("Wrote {}", path.display());
        }
        None => info!("No document written: no slides with visual elements"),
    }

    Ok(output.stats)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SlideVisualsError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SlideVisualsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Summarise the shapes of a deck with the default visual kinds.
///
/// Does not contact the conversion service and needs no pdfium library.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DeckSummary, SlideVisualsError> {
    let config = ExtractionConfig::default();
    inspect_with_config(input_str, &config).await
}

/// Like [`inspect`], honouring the visual kinds and slide selection of `config`.
pub async fn inspect_with_config(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DeckSummary, SlideVisualsError> {
    let deck_input = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let deck = Deck::from_bytes(&deck_input.bytes, &deck_input.name)?;
    let visual = detect::visual_slide_numbers(&deck, &config.visual_kinds, &config.slides);
    Ok(DeckSummary::new(&deck, &config.visual_kinds, &visual))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run the pipeline on a deck held in memory.
pub(crate) async fn extract_deck(
    deck_input: DeckInput,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, SlideVisualsError> {
    let total_start = Instant::now();

    // ── Step 1: Parse and classify ───────────────────────────────────────
    let deck = Deck::from_bytes(&deck_input.bytes, &deck_input.name)?;
    let selected = config.slides.to_numbers(deck.slide_count());
    info!(
        "Deck '{}' has {} slides ({} selected)",
        deck_input.name,
        deck.slide_count(),
        selected.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(selected.len());
    }

    // ── Step 2: Detect visual slides ─────────────────────────────────────
    let visual = detect::visual_slide_numbers(&deck, &config.visual_kinds, &config.slides);
    info!("Slides with visual elements: {:?}", visual);
    if let Some(ref cb) = config.progress_callback {
        cb.on_slides_detected(&visual);
    }

    let summary = DeckSummary::new(&deck, &config.visual_kinds, &visual);
    let mut stats = ExtractionStats {
        total_slides: deck.slide_count(),
        selected_slides: selected.len(),
        visual_slides: visual.len(),
        deck_bytes: deck_input.bytes.len(),
        ..ExtractionStats::default()
    };

    // ── Step 3: Convert to PDF ───────────────────────────────────────────
    let converter = resolve_converter(config)?;
    let conversion_start = Instant::now();
    let pdf = converter
        .convert(&deck_input.bytes, &deck_input.name)
        .await?;
    stats.conversion_duration_ms = conversion_start.elapsed().as_millis() as u64;
    stats.pdf_bytes = pdf.len();
    info!(
        "Conversion returned {} bytes in {}ms",
        pdf.len(),
        stats.conversion_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(pdf.len(), stats.conversion_duration_ms);
    }

    if visual.is_empty() {
        info!("No slides with visual elements found");
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_complete(0, 0);
        }
        return Ok(ExtractionOutput {
            visual_slides: visual,
            images: Vec::new(),
            document: None,
            summary,
            stats,
        });
    }

    // ── Step 4: Rasterise qualifying pages ───────────────────────────────
    let page_indices: Vec<usize> = visual.iter().map(|n| n - 1).collect();
    let render_start = Instant::now();
    let rendered =
        render::render_pages(resolve_renderer(config), Arc::new(pdf), page_indices).await?;
    stats.render_duration_ms = render_start.elapsed().as_millis() as u64;
    stats.pdf_pages = rendered.page_count;

    // ── Step 5: Encode PNGs ──────────────────────────────────────────────
    let mut images: Vec<SlideImage> = Vec::with_capacity(rendered.images.len());
    for (idx, img) in &rendered.images {
        let slide_number = idx + 1;
        if !visual.contains(&slide_number) {
            debug!("Ignoring unrequested page {}", slide_number);
            continue;
        }
        let slide = encode::encode_slide(slide_number, img)?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_slide_rendered(slide_number, visual.len(), slide.png.len());
        }
        images.push(slide);
    }
    images.sort_by_key(|img| img.slide_number);
    images.dedup_by_key(|img| img.slide_number);

    stats.skipped_slides = visual
        .iter()
        .copied()
        .filter(|n| images.binary_search_by_key(n, |img| img.slide_number).is_err())
        .collect();
    for &n in &stats.skipped_slides {
        warn!(
            "Slide {} has no page in the converted PDF ({} pages)",
            n, rendered.page_count
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_slide_skipped(n, &format!("PDF has {} pages", rendered.page_count));
        }
    }
    stats.rendered_slides = images.len();

    // ── Step 6: Assemble document ────────────────────────────────────────
    let document = if images.is_empty() {
        None
    } else {
        let bytes = assemble::assemble_document(
            &config.document_title,
            &images,
            config.image_width_inches,
        )?;
        stats.document_bytes = bytes.len();
        Some(bytes)
    };

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {}/{} visual slides rendered, {}ms total",
        stats.rendered_slides, stats.visual_slides, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(visual.len(), images.len());
    }

    Ok(ExtractionOutput {
        visual_slides: visual,
        images,
        document,
        summary,
        stats,
    })
}

/// The injected converter, or an HTTP client for `service_url`.
fn resolve_converter(config: &ExtractionConfig) -> Result<Arc<dyn DeckConverter>, SlideVisualsError> {
    if let Some(ref converter) = config.converter {
        return Ok(Arc::clone(converter));
    }
    Ok(Arc::new(HttpConverter::new(
        config.service_url.clone(),
        config.conversion_timeout_secs,
    )?))
}

/// The injected renderer, or pdfium with the configured DPI and size cap.
fn resolve_renderer(config: &ExtractionConfig) -> Arc<dyn PageRenderer> {
    if let Some(ref renderer) = config.renderer {
        return Arc::clone(renderer);
    }
    Arc::new(PdfiumRenderer::new(
        config.dpi,
        config.max_rendered_pixels,
        config.pdfium_lib_path.clone(),
    ))
}

/// Write `bytes` to a temporary file next to `path`, then rename it into place.
///
/// Missing parent directories are created. An existing file at `path` is
/// replaced whole or left untouched.
pub async fn write_atomic(
    path: impl AsRef<Path>,
    bytes: Vec<u8>,
) -> Result<(), SlideVisualsError> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let write_failed = |source: std::io::Error| SlideVisualsError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(write_failed)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_failed)?;
        tmp.write_all(&bytes).map_err(write_failed)?;
        tmp.persist(&path).map_err(|e| write_failed(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| SlideVisualsError::Internal(format!("Write task panicked: {}", e)))?
}
