use serde::Deserialize;
use serde_json::Value;

use crate::error::EnrichmentFailure;

/// Bibliographic fields proposed by the model. Every field is optional and
/// independent of the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinedMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Option<Vec<String>>,
    #[serde(default)]
    year: Option<Value>,
}

/// Parses the model's reply. Markdown code fences are tolerated; anything
/// that is not a JSON object of the expected shape is rejected whole.
pub fn parse_refined_metadata(reply: &str) -> Result<RefinedMetadata, EnrichmentFailure> {
    let cleaned = strip_code_fences(reply);
    let raw: RawMetadata = serde_json::from_str(cleaned)
        .map_err(|e| EnrichmentFailure::Parse(format!("metadata JSON: {e}")))?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let authors = raw
        .authors
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    let year = raw.year.as_ref().and_then(year_from_value);

    Ok(RefinedMetadata {
        title,
        authors,
        year,
    })
}

fn year_from_value(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
