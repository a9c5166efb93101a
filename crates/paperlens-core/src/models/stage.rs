use std::fmt;

use serde::{Deserialize, Serialize};

/// States an upload moves through, in order. No stage starts before the
/// previous one has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Extracting,
    MetadataHeuristics,
    MetadataRefining,
    Summarizing,
    KeywordExtracting,
    RelatedWorkSearching,
    Merging,
    Persisted,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 8] = [
        Self::Extracting,
        Self::MetadataHeuristics,
        Self::MetadataRefining,
        Self::Summarizing,
        Self::KeywordExtracting,
        Self::RelatedWorkSearching,
        Self::Merging,
        Self::Persisted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::MetadataHeuristics => "metadata_heuristics",
            Self::MetadataRefining => "metadata_refining",
            Self::Summarizing => "summarizing",
            Self::KeywordExtracting => "keyword_extracting",
            Self::RelatedWorkSearching => "related_work_searching",
            Self::Merging => "merging",
            Self::Persisted => "persisted",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
