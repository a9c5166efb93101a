use std::sync::Arc;

use chrono::{Datelike, Utc};
use paperlens_core::text::{char_len, head_chars};
use paperlens_core::{ExplorerConfig, RelatedWork};
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::clock::Sleeper;
use crate::error::{Result, ScienceError};
use crate::extract::heuristics::UNKNOWN_AUTHOR;
use crate::http::{RetryPolicy, RetryingClient, parse_base_url};

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const SEARCH_FIELDS: &str = "title,authors,abstract,year,url,paperId,citationCount";
const DOI_FIELDS: &str = "title,authors,abstract,year,url";
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

pub const DEFAULT_QUERY: &str = "machine learning research";
pub const NO_ABSTRACT: &str = "No abstract available";
const MIN_QUERY_CHARS: usize = 3;
const MAX_QUERY_CHARS: usize = 200;
const MAX_REQUEST_LIMIT: usize = 20;

// ─── Response parsing ─────────────────────────────────────────────────────────

/// A search hit before ranking. The citation count orders results and is
/// dropped afterwards.
#[derive(Debug, Clone)]
struct RankedHit {
    work: RelatedWork,
    citation_count: u64,
}

impl RankedHit {
    /// `None` for entries without a title or without any author.
    fn from_json(v: &Value, current_year: i32) -> Option<Self> {
        let title = non_empty_str(v.get("title"))?.to_string();

        let authors = author_names(v);
        if authors.is_empty() {
            return None;
        }

        let url = non_empty_str(v.get("url"))
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| {
                let paper_id = v.get("paperId").and_then(Value::as_str).unwrap_or_default();
                format!("https://www.semanticscholar.org/paper/{paper_id}")
            });

        Some(Self {
            work: RelatedWork {
                title,
                authors,
                abstract_text: abstract_or_default(v),
                url,
                year: year_or(v, current_year),
            },
            citation_count: v.get("citationCount").and_then(Value::as_u64).unwrap_or(0),
        })
    }
}

fn author_names(v: &Value) -> Vec<String> {
    v.get("authors")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|author| {
                    non_empty_str(author.get("name"))
                        .unwrap_or(UNKNOWN_AUTHOR)
                        .to_string()
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn abstract_or_default(v: &Value) -> String {
    non_empty_str(v.get("abstract"))
        .unwrap_or(NO_ABSTRACT)
        .to_string()
}

fn year_or(v: &Value, fallback: i32) -> i32 {
    v.get("year")
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| *n != 0)
        .unwrap_or(fallback)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Sorts by citation count (descending, stable) and keeps at most `limit`.
fn rank(mut hits: Vec<RankedHit>, limit: usize) -> Vec<RelatedWork> {
    hits.sort_by(|a, b| b.citation_count.cmp(&a.citation_count));
    hits.into_iter().take(limit).map(|hit| hit.work).collect()
}

/// Queries under three characters are replaced; long ones are clipped.
pub fn normalize_query(query: &str) -> String {
    let trimmed = query.trim();
    if char_len(trimmed) < MIN_QUERY_CHARS {
        tracing::warn!(query = trimmed, "query too short, using default search");
        return DEFAULT_QUERY.to_string();
    }
    head_chars(trimmed, MAX_QUERY_CHARS).trim().to_string()
}

// ─── Explorer ─────────────────────────────────────────────────────────────────

/// Related-work discovery over the Semantic Scholar Graph API.
pub struct SemanticScholarExplorer {
    client: RetryingClient,
    base_url: String,
    api_key: Option<String>,
    default_limit: usize,
}

impl SemanticScholarExplorer {
    pub fn new(config: &ExplorerConfig) -> Result<Self> {
        let policy = RetryPolicy::new(config.max_retries, config.backoff_base());
        let client = RetryingClient::new(config.timeout(), policy, "paperlens/0.1")?;
        let base_url = if config.base_url.trim().is_empty() {
            BASE_URL.to_string()
        } else {
            config.base_url.trim().to_string()
        };

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key(),
            default_limit: config.default_limit,
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.client = self.client.with_sleeper(sleeper);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Most-cited related papers for `query`, at most `limit`.
    /// Never fails; any error yields an empty list.
    pub async fn find_related(&self, query: &str, limit: usize) -> Vec<RelatedWork> {
        match self.try_find_related(query, limit).await {
            Ok(papers) => papers,
            Err(err) => {
                tracing::error!(error = %err, "related papers search failed");
                Vec::new()
            }
        }
    }

    pub async fn try_find_related(&self, query: &str, limit: usize) -> Result<Vec<RelatedWork>> {
        let query = normalize_query(query);
        tracing::info!(%query, limit, "searching related papers");

        let mut url = self.endpoint(&["paper", "search"])?;
        url.query_pairs_mut()
            .append_pair("query", &query)
            .append_pair("limit", &limit.min(MAX_REQUEST_LIMIT).to_string())
            .append_pair("fields", SEARCH_FIELDS);

        let json = self.client.get_json(&url, &self.auth_headers()?).await?;
        let Some(items) = json.get("data").and_then(Value::as_array) else {
            tracing::warn!("no papers found in search response");
            return Ok(Vec::new());
        };

        let current_year = Utc::now().year();
        let hits = items
            .iter()
            .filter_map(|item| RankedHit::from_json(item, current_year))
            .collect::<Vec<_>>();

        let papers = rank(hits, limit);
        tracing::info!(found = papers.len(), "related papers ranked");
        Ok(papers)
    }

    /// Looks up a single paper by DOI. Never fails; any error yields `None`.
    pub async fn find_by_doi(&self, doi: &str) -> Option<RelatedWork> {
        match self.try_find_by_doi(doi).await {
            Ok(paper) => Some(paper),
            Err(err) => {
                tracing::error!(doi, error = %err, "DOI lookup failed");
                None
            }
        }
    }

    pub async fn try_find_by_doi(&self, doi: &str) -> Result<RelatedWork> {
        let doi = doi.trim();
        let mut url = self.doi_endpoint(doi)?;
        url.query_pairs_mut().append_pair("fields", DOI_FIELDS);

        let json = self.client.get_json_once(&url, &self.auth_headers()?).await?;
        if !json.is_object() {
            return Err(ScienceError::Parse(
                "unexpected Semantic Scholar paper response".to_string(),
            ));
        }

        Ok(RelatedWork {
            title: json
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            authors: json
                .get("authors")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|a| a.get("name").and_then(Value::as_str))
                        .map(ToOwned::to_owned)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
            abstract_text: abstract_or_default(&json),
            url: non_empty_str(json.get("url"))
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| format!("https://doi.org/{doi}")),
            year: year_or(&json, Utc::now().year()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = parse_base_url(&self.base_url)?;
        {
            let mut segs = url.path_segments_mut().map_err(|_| {
                ScienceError::Parse("invalid Semantic Scholar base URL".to_string())
            })?;
            segs.pop_if_empty();
            segs.extend(segments);
        }
        Ok(url)
    }

    /// `paper/DOI:<doi>` with the DOI's own slashes left as path separators.
    fn doi_endpoint(&self, doi: &str) -> Result<Url> {
        let paper_id = format!("DOI:{doi}");
        let mut segments = vec!["paper"];
        segments.extend(paper_id.split('/'));
        self.endpoint(&segments)
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let value =
                HeaderValue::from_str(key).map_err(|e| ScienceError::Parse(e.to_string()))?;
            headers.insert(API_KEY_HEADER, value);
        }
        Ok(headers)
    }
}
