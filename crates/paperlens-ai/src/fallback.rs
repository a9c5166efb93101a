//! Display-ready text used whenever an enrichment stage degrades.
//!
//! Every fallback literal lives here; call sites choose one through the
//! failure reason instead of repeating strings.

use crate::error::EnrichmentFailure;

pub const SUMMARY_UNAVAILABLE: &str = "**Summary Unavailable**\n\nThis document appears to be a scanned PDF or image. Text extraction failed. Please try a text-based PDF.";

pub const SYSTEM_BUSY: &str = "**System Busy (Rate Limit Reached)**\n\nThe AI service is currently receiving too many requests per minute.\n\n**What to do:**\n1. Wait 30 seconds.\n2. Try refreshing or re-uploading.\n3. Use the Chat feature (it uses fewer resources).";

pub const ANSWER_UNAVAILABLE: &str = "I apologize, but I cannot answer right now due to high traffic or an error. Please try again in a moment.";

/// Returned by the client's own keyword fallback.
pub const CLIENT_KEYWORDS: [&str; 3] = ["Research", "Analysis", "Academic"];

/// Used by the ingestion pipeline when keyword extraction degrades.
pub const PIPELINE_KEYWORDS: [&str; 2] = ["Research", "Analysis"];

pub fn summary_failed(detail: &str) -> String {
    format!(
        "**Summary Generation Failed**\n\nAn error occurred: {detail}. Please try using the chat feature."
    )
}

/// Summary text for a failed summarization.
pub fn summary_for(failure: &EnrichmentFailure) -> String {
    match failure {
        EnrichmentFailure::InsufficientText => SUMMARY_UNAVAILABLE.to_string(),
        EnrichmentFailure::RateLimited(_) => SYSTEM_BUSY.to_string(),
        EnrichmentFailure::Model(detail) | EnrichmentFailure::Parse(detail) => {
            summary_failed(detail)
        }
    }
}

pub fn client_keywords() -> Vec<String> {
    CLIENT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

pub fn pipeline_keywords() -> Vec<String> {
    PIPELINE_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_maps_to_busy_message() {
        let text = summary_for(&EnrichmentFailure::RateLimited("429".to_string()));
        assert_eq!(text, SYSTEM_BUSY);
    }

    #[test]
    fn generic_failure_carries_detail() {
        let text = summary_for(&EnrichmentFailure::Model("boom".to_string()));
        assert!(text.starts_with("**Summary Generation Failed**"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn insufficient_text_maps_to_unavailable() {
        assert_eq!(
            summary_for(&EnrichmentFailure::InsufficientText),
            SUMMARY_UNAVAILABLE
        );
    }
}
