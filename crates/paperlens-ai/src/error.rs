use thiserror::Error;

/// Errors raised by a [`crate::GenerativeModel`] backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited [{status}]: {message}")]
    RateLimited { status: u16, message: String },

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("missing API key: set {0}")]
    MissingApiKey(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),
}

impl ModelError {
    /// True when the provider signalled a quota or rate limit.
    ///
    /// The structured variant and a 429 status are authoritative. Provider
    /// messages on other statuses fall back to [`message_signals_rate_limit`];
    /// transport errors never count, since their text carries the request URL.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status: 429, .. } => true,
            Self::Api { message, .. } => message_signals_rate_limit(message),
            Self::Http(_)
            | Self::EmptyResponse
            | Self::MissingApiKey(_)
            | Self::UnsupportedProvider(_) => false,
        }
    }
}

/// Substring heuristic for quota errors: `429`, `quota`, `rate limit` or
/// `resource_exhausted`, case-insensitive.
pub fn message_signals_rate_limit(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("429")
        || lower.contains("quota")
        || lower.contains("rate limit")
        || lower.contains("resource_exhausted")
}

/// Why an enrichment operation produced no genuine value. The caller picks
/// the fallback; see [`crate::fallback`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentFailure {
    #[error("document text is too short or scanned")]
    InsufficientText,

    #[error("model is rate limited: {0}")]
    RateLimited(String),

    #[error("model call failed: {0}")]
    Model(String),

    #[error("unusable model response: {0}")]
    Parse(String),
}

impl From<ModelError> for EnrichmentFailure {
    fn from(err: ModelError) -> Self {
        if err.is_rate_limited() {
            Self::RateLimited(err.to_string())
        } else {
            Self::Model(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_rate_limit_wins() {
        let err = ModelError::RateLimited {
            status: 429,
            message: "slow down".to_string(),
        };
        assert!(err.is_rate_limited());
        assert!(matches!(
            EnrichmentFailure::from(err),
            EnrichmentFailure::RateLimited(_)
        ));
    }

    #[test]
    fn message_heuristic_catches_quota_text() {
        let err = ModelError::Api {
            status: 400,
            message: "You exceeded your current quota".to_string(),
        };
        assert!(err.is_rate_limited());
        assert!(!ModelError::EmptyResponse.is_rate_limited());
    }

    #[test]
    fn status_text_outside_the_message_is_ignored() {
        let err = ModelError::MissingApiKey("GEMINI_KEY_429".to_string());
        assert!(!err.is_rate_limited());
        let err = ModelError::Api {
            status: 500,
            message: "backend unavailable".to_string(),
        };
        assert!(!err.is_rate_limited());
    }

    #[tokio::test]
    async fn transport_error_with_429_in_url_is_not_a_rate_limit() {
        // Nothing listens on port 9; the URL still carries "429".
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/v1beta/models/m-429:generateContent")
            .send()
            .await
            .unwrap_err();
        let err = ModelError::from(err);
        assert!(err.to_string().contains("429"));
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn heuristic_matches_status_code_in_text() {
        assert!(message_signals_rate_limit("[GoogleGenerativeAI Error]: 429 Too Many Requests"));
        assert!(message_signals_rate_limit("Rate limit reached"));
        assert!(!message_signals_rate_limit("internal error"));
    }
}
