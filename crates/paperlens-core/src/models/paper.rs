use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RelatedWork;
use crate::error::CoreError;

// ─── Publication years ─────────────────────────────────────

/// Earliest publication year accepted anywhere in a paper record.
pub const MIN_PUBLICATION_YEAR: i32 = 1900;

/// Latest publication year accepted anywhere in a paper record.
pub const MAX_PUBLICATION_YEAR: i32 = 2100;

pub fn is_plausible_year(year: i32) -> bool {
    (MIN_PUBLICATION_YEAR..=MAX_PUBLICATION_YEAR).contains(&year)
}

// ─── PaperId ───────────────────────────────────────────────

/// Identifier generated by the store when a record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(Uuid);

impl PaperId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaperId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PaperId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaperId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| CoreError::InvalidPaperId(s.to_string()))
    }
}

// ─── IngestionResult ───────────────────────────────────────

/// The merged record produced once per upload and handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub full_text: String,
    pub summary: String,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub upload_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub related_work: Vec<RelatedWork>,
}

impl IngestionResult {
    /// Publication year, or the upload year when the paper carries none.
    pub fn display_year(&self) -> i32 {
        use chrono::Datelike;
        self.year.unwrap_or_else(|| self.upload_timestamp.year())
    }
}

/// A persisted record together with the id the store assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPaper {
    pub id: PaperId,
    #[serde(flatten)]
    pub record: IngestionResult,
}

/// Lightweight listing row: everything except the full text and related work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSummaryView {
    pub id: PaperId,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub keywords: Vec<String>,
    pub upload_timestamp: DateTime<Utc>,
    pub related_work_count: usize,
}
