use paperlens_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {url} [{status}]: {message}")]
    Api {
        url: String,
        status: u16,
        message: String,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),
}

impl ScienceError {
    /// Network-class failures (timeout, DNS, refused connection) and 5xx
    /// responses. Everything else fails on the first attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.status().is_some_and(|s| s.is_server_error())
            }
            Self::Api { status, .. } => *status >= 500,
            Self::Parse(_) | Self::PdfExtraction(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;

/// The two conditions that abort an ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document could not be read: {0}")]
    Extraction(#[source] ScienceError),

    #[error("paper could not be saved: {0}")]
    Persistence(#[source] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ScienceError {
        ScienceError::Api {
            url: "http://localhost/paper/search".to_string(),
            status,
            message: String::new(),
        }
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
    }

    #[test]
    fn client_errors_and_bad_payloads_are_final() {
        assert!(!api(400).is_retryable());
        assert!(!api(404).is_retryable());
        assert!(!api(429).is_retryable());
        assert!(!ScienceError::Parse("truncated".to_string()).is_retryable());
    }
}
