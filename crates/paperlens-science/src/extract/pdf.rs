use lopdf::Document;
use paperlens_core::text::{SCANNED_DOCUMENT_PLACEHOLDER, char_len};

use crate::error::{Result, ScienceError};

/// Extracted text shorter than this (after trimming) is treated as an
/// image-only document.
pub const MIN_EXTRACTED_CHARS: usize = 50;

const PAGE_SEPARATOR: &str = "\n\n";

/// A page-oriented document whose pages can be read one at a time.
pub trait PageSource {
    /// Page numbers in reading order.
    fn page_numbers(&self) -> Vec<u32>;
    fn page_text(&self, page: u32) -> Result<String>;
}

pub struct LopdfDocument {
    document: Document,
}

impl LopdfDocument {
    /// Parses an in-memory PDF. Fails only when the container itself is
    /// unreadable; broken pages surface later through [`PageSource::page_text`].
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let document = Document::load_mem(bytes)
            .map_err(|err| ScienceError::PdfExtraction(format!("lopdf failed to open document: {err}")))?;
        Ok(Self { document })
    }
}

impl PageSource for LopdfDocument {
    fn page_numbers(&self) -> Vec<u32> {
        self.document.get_pages().keys().copied().collect()
    }

    fn page_text(&self, page: u32) -> Result<String> {
        self.document.extract_text(&[page]).map_err(|err| {
            ScienceError::PdfExtraction(format!("lopdf failed to extract page {page}: {err}"))
        })
    }
}

/// Decodes a PDF and returns its text, or the scanned-document placeholder
/// when almost nothing could be read.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let document = LopdfDocument::load(bytes)?;
    Ok(extract_pages(&document))
}

/// Concatenates page text in order, each page followed by a blank line.
/// Pages that fail are logged and skipped.
pub fn extract_pages<P: PageSource + ?Sized>(source: &P) -> String {
    let pages = source.page_numbers();
    tracing::info!(pages = pages.len(), "extracting document text");

    let mut full_text = String::new();
    for page in pages {
        match source.page_text(page) {
            Ok(text) => {
                full_text.push_str(&text);
                full_text.push_str(PAGE_SEPARATOR);
            }
            Err(err) => tracing::warn!(page, error = %err, "skipping unreadable page"),
        }
    }

    if char_len(full_text.trim()) < MIN_EXTRACTED_CHARS {
        tracing::warn!("very little text extracted, document is probably scanned");
        return SCANNED_DOCUMENT_PLACEHOLDER.to_string();
    }
    full_text
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory pages; `None` marks a page that fails to decode.
    pub struct FakePages(pub Vec<Option<String>>);

    impl PageSource for FakePages {
        fn page_numbers(&self) -> Vec<u32> {
            (1..=self.0.len() as u32).collect()
        }

        fn page_text(&self, page: u32) -> Result<String> {
            self.0[page as usize - 1]
                .clone()
                .ok_or_else(|| ScienceError::PdfExtraction(format!("page {page} is corrupt")))
        }
    }

    #[test]
    fn pages_are_joined_with_blank_lines() {
        let pages = FakePages(vec![
            Some("Deep Residual Learning for Image Recognition".to_string()),
            Some("We present a residual learning framework.".to_string()),
        ]);
        assert_eq!(
            extract_pages(&pages),
            "Deep Residual Learning for Image Recognition\n\nWe present a residual learning framework.\n\n"
        );
    }

    #[test]
    fn failing_page_is_skipped() {
        let pages = FakePages(vec![
            Some("First page with plenty of readable words on it.".to_string()),
            None,
            Some("Third page follows.".to_string()),
        ]);
        let text = extract_pages(&pages);
        assert_eq!(
            text,
            "First page with plenty of readable words on it.\n\nThird page follows.\n\n"
        );
    }

    #[test]
    fn near_empty_text_becomes_placeholder() {
        let pages = FakePages(vec![Some("  30 characters of page text  ".to_string()), None]);
        assert_eq!(extract_pages(&pages), SCANNED_DOCUMENT_PLACEHOLDER);
    }

    #[test]
    fn document_without_pages_becomes_placeholder() {
        assert_eq!(extract_pages(&FakePages(Vec::new())), SCANNED_DOCUMENT_PLACEHOLDER);
    }

    #[test]
    fn garbage_bytes_fail_to_open() {
        let err = extract_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, ScienceError::PdfExtraction(_)));
    }
}
