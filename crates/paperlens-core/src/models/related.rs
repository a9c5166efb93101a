use serde::{Deserialize, Serialize};

/// One related paper as persisted with an ingested record. The citation
/// count used for ranking is not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedWork {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub year: i32,
}
