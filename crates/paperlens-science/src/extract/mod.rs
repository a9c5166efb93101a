pub mod heuristics;
pub mod pdf;

pub use heuristics::{ExtractedDocument, HeuristicMetadata, extract_metadata};
pub use pdf::{LopdfDocument, PageSource, extract_pages, extract_text};
