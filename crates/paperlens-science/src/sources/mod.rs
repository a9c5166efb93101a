pub mod semantic_scholar;

pub use semantic_scholar::SemanticScholarExplorer;
