use std::sync::Arc;

use paperlens_core::text::{char_len, head_chars, is_scanned_placeholder, tail_chars};

use crate::error::EnrichmentFailure;
use crate::fallback;
use crate::metadata::{RefinedMetadata, parse_refined_metadata};
use crate::prompts;
use crate::provider::GenerativeModel;

/// Character budgets for each prompt.
pub const METADATA_INPUT_CHARS: usize = 10_000;
pub const SUMMARY_INPUT_CHARS: usize = 30_000;
pub const KEYWORD_INPUT_CHARS: usize = 10_000;
pub const ANSWER_DOCUMENT_CHARS: usize = 40_000;
pub const ANSWER_HISTORY_CHARS: usize = 2_000;

/// Summaries are not attempted below this many characters of input.
pub const MIN_SUMMARY_INPUT_CHARS: usize = 500;
pub const MAX_KEYWORDS: usize = 10;

/// The four enrichment capabilities over one model connection.
///
/// `try_*` methods report a tagged [`EnrichmentFailure`]; the plain methods
/// never fail and substitute the matching text from [`crate::fallback`].
/// Operations share no state and can be called in any order.
#[derive(Clone)]
pub struct EnrichmentClient {
    model: Arc<dyn GenerativeModel>,
}

impl EnrichmentClient {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    // ── Metadata ──────────────────────────────────────────────────────────────

    pub async fn refine_metadata(&self, text: &str) -> Result<RefinedMetadata, EnrichmentFailure> {
        let prompt = prompts::metadata(head_chars(text, METADATA_INPUT_CHARS));
        let reply = self.model.generate(&prompt).await?;
        parse_refined_metadata(&reply)
    }

    // ── Summary ───────────────────────────────────────────────────────────────

    pub async fn try_summarize(&self, text: &str) -> Result<String, EnrichmentFailure> {
        if is_scanned_placeholder(text) || char_len(text) < MIN_SUMMARY_INPUT_CHARS {
            return Err(EnrichmentFailure::InsufficientText);
        }
        let prompt = prompts::summary(head_chars(text, SUMMARY_INPUT_CHARS));
        Ok(self.model.generate(&prompt).await?)
    }

    pub async fn summarize(&self, text: &str) -> String {
        match self.try_summarize(text).await {
            Ok(summary) => summary,
            Err(failure) => {
                if failure != EnrichmentFailure::InsufficientText {
                    tracing::warn!(reason = %failure, "summary generation failed");
                }
                fallback::summary_for(&failure)
            }
        }
    }

    // ── Keywords ──────────────────────────────────────────────────────────────

    pub async fn try_extract_keywords(&self, text: &str) -> Result<Vec<String>, EnrichmentFailure> {
        let prompt = prompts::keywords(head_chars(text, KEYWORD_INPUT_CHARS));
        let reply = self.model.generate(&prompt).await?;
        let keywords = split_keywords(&reply);
        if keywords.is_empty() {
            return Err(EnrichmentFailure::Parse("no keywords in reply".to_string()));
        }
        Ok(keywords)
    }

    pub async fn extract_keywords(&self, text: &str) -> Vec<String> {
        self.try_extract_keywords(text).await.unwrap_or_else(|failure| {
            tracing::warn!(reason = %failure, "keyword extraction failed");
            fallback::client_keywords()
        })
    }

    // ── Question answering ────────────────────────────────────────────────────

    pub async fn try_answer_question(
        &self,
        document: &str,
        question: &str,
        history: &str,
    ) -> Result<String, EnrichmentFailure> {
        let prompt = prompts::answer(
            head_chars(document, ANSWER_DOCUMENT_CHARS),
            tail_chars(history, ANSWER_HISTORY_CHARS),
            question,
        );
        Ok(self.model.generate(&prompt).await?)
    }

    pub async fn answer_question(&self, document: &str, question: &str, history: &str) -> String {
        match self.try_answer_question(document, question, history).await {
            Ok(answer) => answer,
            Err(failure) => {
                tracing::warn!(reason = %failure, "question answering failed");
                fallback::ANSWER_UNAVAILABLE.to_string()
            }
        }
    }
}

fn split_keywords(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .take(MAX_KEYWORDS)
        .map(ToOwned::to_owned)
        .collect()
}
