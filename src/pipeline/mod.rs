//! Pipeline stages for slide extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ detect ──▶ convert ──▶ render ──▶ encode ──▶ assemble
//! (bytes)   (shapes)   (HTTP)      (pdfium)   (PNG)      (DOCX)
//! ```
//!
//! 1. [`input`]: read the local path or download the URL into memory
//! 2. [`detect`]: pick slides with visual shapes from the parsed [`crate::deck::Deck`]
//! 3. [`convert`]: post the deck to the conversion service; the only stage
//!    with network I/O
//! 4. [`render`]: rasterise the qualifying pages; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 5. [`encode`]: RGB PNG per slide
//! 6. [`assemble`]: headings and inline pictures in a `.docx`

pub mod assemble;
pub mod convert;
pub mod detect;
pub mod encode;
pub mod input;
pub mod render;
