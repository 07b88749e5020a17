//! Image encoding: `DynamicImage` → RGB PNG bytes.
//!
//! pdfium hands back RGBA bitmaps. The alpha channel is dropped before
//! encoding; slides are opaque and Word renders RGB pictures everywhere.

use crate::error::SlideVisualsError;
use crate::output::SlideImage;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode the rendered page of `slide_number` as an RGB PNG.
pub fn encode_slide(slide_number: usize, img: &DynamicImage) -> Result<SlideImage, SlideVisualsError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut png = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| SlideVisualsError::ImageEncodingFailed {
            slide: slide_number,
            detail: e.to_string(),
        })?;

    debug!("Encoded slide {} → {} bytes PNG", slide_number, png.len());

    Ok(SlideImage {
        slide_number,
        width: rgb.width(),
        height: rgb.height(),
        png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 4, Rgba([255, 0, 0, 128])));
        let slide = encode_slide(3, &img).expect("encode should succeed");
        assert_eq!(slide.slide_number, 3);
        assert_eq!((slide.width, slide.height), (10, 4));
        assert!(slide.png.starts_with(b"\x89PNG\r\n\x1a\n"));

        let decoded = image::load_from_memory(&slide.png).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
        assert_eq!((decoded.width(), decoded.height()), (10, 4));
    }
}
