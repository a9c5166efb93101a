//! Character-budget helpers shared by the extractor and the AI client.
//!
//! Budgets are counted in `char`s, never bytes, so clipping cannot split a
//! UTF-8 sequence.

/// Marker embedded in [`SCANNED_DOCUMENT_PLACEHOLDER`].
pub const SCANNED_DOCUMENT_MARKER: &str = "SCANNED_PDF_WARNING";

/// Substituted for the extracted text of a document without a text layer.
pub const SCANNED_DOCUMENT_PLACEHOLDER: &str = "[SCANNED_PDF_WARNING] This document appears to be an image-based PDF. Text extraction is limited.";

pub fn is_scanned_placeholder(text: &str) -> bool {
    text.contains(SCANNED_DOCUMENT_MARKER)
}

/// First `max` characters of `text`.
pub fn head_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Last `max` characters of `text`.
pub fn tail_chars(text: &str, max: usize) -> &str {
    if max == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
