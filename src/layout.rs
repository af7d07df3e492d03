//! Paragraph reconstruction from positioned text fragments.
//!
//! Extraction layers emit text as a flat list of fragments in visual order,
//! each tagged with its vertical position. A jump in vertical position larger
//! than a fixed gap is taken to be a paragraph break; anything smaller joins
//! with a single space. This is a heuristic, not a layout parser: multi-column
//! or rotated pages may break in the wrong places.

use unicode_normalization::UnicodeNormalization;

/// Default vertical distance (layout units) that counts as a paragraph break.
pub const DEFAULT_PARAGRAPH_GAP: f32 = 12.0;

/// One positioned fragment as emitted by the extraction layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub y: f32,
    pub text: String,
}

impl TextItem {
    pub fn new(y: f32, text: impl Into<String>) -> Self {
        Self {
            y,
            text: text.into(),
        }
    }
}

/// Reconstructed text for a single page. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: usize,
    pub raw_text: String,
}

/// Merge a page's fragments into one string, inserting `\n\n` wherever the
/// vertical position jumps by more than `paragraph_gap`.
pub fn reconstruct_page(items: &[TextItem], paragraph_gap: f32) -> String {
    let mut out = String::new();
    let mut last_y: Option<f32> = None;

    for item in items {
        if let Some(last) = last_y {
            if (item.y - last).abs() > paragraph_gap {
                out.push_str("\n\n");
            } else {
                out.push(' ');
            }
        }
        out.push_str(&item.text);
        last_y = Some(item.y);
    }

    // Page extraction tends to emit ligatures and compatibility forms.
    out.trim().nfkc().collect()
}
