//! paperlens science: PDF extraction, related-work search and the ingestion
//! pipeline that ties them to the enrichment client.

pub mod clock;
pub mod enrichment;
pub mod error;
pub mod extract;
pub mod http;
pub mod sources;

pub use clock::{RecordingSleeper, Sleeper, TokioSleeper};
pub use enrichment::{IngestionOutcome, IngestionPipeline, IngestionReport};
pub use error::{IngestError, Result, ScienceError};
pub use extract::{ExtractedDocument, HeuristicMetadata, PageSource, extract_metadata, extract_text};
pub use http::RetryPolicy;
pub use sources::SemanticScholarExplorer;
