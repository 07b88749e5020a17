//! Visual-slide detection.

use crate::config::SlideSelection;
use crate::deck::{Deck, ShapeKind};

/// Ascending 1-based numbers of the selected slides that carry at least one
/// shape whose kind is in `kinds`.
///
/// Each slide stops at its first matching shape.
pub fn visual_slide_numbers(
    deck: &Deck,
    kinds: &[ShapeKind],
    selection: &SlideSelection,
) -> Vec<usize> {
    deck.slides
        .iter()
        .filter(|slide| selection.contains(slide.number))
        .filter(|slide| slide.has_any(kinds))
        .map(|slide| slide.number)
        .collect()
}
