pub mod merge;
pub mod pipeline;

pub use merge::{MergedMetadata, PartialMetadata, merge_refined, overlay};
pub use pipeline::{DegradedStage, IngestionOutcome, IngestionPipeline, IngestionReport};
