//! PDF rasterisation: render the pages of qualifying slides via pdfium.
//!
//! Page `n - 1` of the converted PDF is slide `n`. Rendering is CPU-bound and
//! pdfium is not async-aware, so [`render_pages`] moves the work onto the
//! blocking pool.

use crate::error::SlideVisualsError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pages rendered from one PDF.
#[derive(Debug, Default)]
pub struct RenderedPages {
    /// Total pages in the PDF.
    pub page_count: usize,
    /// `(page_index_0based, image)`, in request order. Indices beyond
    /// `page_count` are absent.
    pub images: Vec<(usize, DynamicImage)>,
}

/// Rasterises pages of an in-memory PDF.
///
/// Called from the blocking pool, so implementations may block freely.
pub trait PageRenderer: Send + Sync {
    fn render(
        &self,
        pdf: &[u8],
        page_indices: &[usize],
    ) -> Result<RenderedPages, SlideVisualsError>;
}

/// Run `renderer` on the blocking pool.
pub async fn render_pages(
    renderer: Arc<dyn PageRenderer>,
    pdf: Arc<Vec<u8>>,
    page_indices: Vec<usize>,
) -> Result<RenderedPages, SlideVisualsError> {
    tokio::task::spawn_blocking(move || renderer.render(&pdf, &page_indices))
        .await
        .map_err(|e| SlideVisualsError::Internal(format!("Render task panicked: {}", e)))?
}

/// Default renderer backed by the pdfium library.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    dpi: u32,
    max_pixels: u32,
    lib_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(dpi: u32, max_pixels: u32, lib_path: Option<PathBuf>) -> Self {
        Self {
            dpi,
            max_pixels,
            lib_path,
        }
    }

    fn render_config(&self) -> PdfRenderConfig {
        PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32)
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(
        &self,
        pdf: &[u8],
        page_indices: &[usize],
    ) -> Result<RenderedPages, SlideVisualsError> {
        let pdfium = bind_pdfium(self.lib_path.as_ref())?;

        let document = pdfium
            .load_pdf_from_byte_vec(pdf.to_vec(), None)
            .map_err(|e| SlideVisualsError::CorruptPdf {
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        info!("PDF loaded: {} pages", page_count);

        let render_config = self.render_config();
        let mut images = Vec::with_capacity(page_indices.len());

        for &idx in page_indices {
            if idx >= page_count {
                warn!(
                    "Skipping slide {} (PDF has only {} pages)",
                    idx + 1,
                    page_count
                );
                continue;
            }

            let page = pages
                .get(idx as u16)
                .map_err(|e| SlideVisualsError::RasterisationFailed {
                    slide: idx + 1,
                    detail: format!("{:?}", e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                SlideVisualsError::RasterisationFailed {
                    slide: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered slide {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push((idx, image));
        }

        Ok(RenderedPages { page_count, images })
    }
}

/// Bind to pdfium, from most-specific to least-specific location:
/// the configured path, `PDFIUM_LIB_PATH`, the working directory, then the
/// system library search path.
fn bind_pdfium(lib_path: Option<&PathBuf>) -> Result<Pdfium, SlideVisualsError> {
    let explicit = lib_path.cloned().or_else(|| {
        std::env::var_os("PDFIUM_LIB_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    });

    if let Some(path) = explicit {
        debug!("Binding pdfium from {}", path.display());
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| {
                SlideVisualsError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e))
            });
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| SlideVisualsError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}
