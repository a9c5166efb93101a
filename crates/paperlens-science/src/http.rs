use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::clock::{Sleeper, TokioSleeper};
use crate::error::{Result, ScienceError};

// ─── RetryPolicy ──────────────────────────────────────────────────────────────

/// Linear backoff: the delay before retry `n` (1-based) is `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn delay_before(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(1000))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are spent. Retries sleep through `sleeper`.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, sleeper: &dyn Sleeper, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if retries < policy.max_retries && err.is_retryable() => {
                retries += 1;
                let delay = policy.delay_before(retries);
                tracing::warn!(
                    error = %err,
                    attempt = retries,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "request failed, retrying"
                );
                sleeper.sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

// ─── RetryingClient ───────────────────────────────────────────────────────────

/// JSON-over-GET client with a per-request timeout and [`RetryPolicy`].
pub struct RetryingClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingClient {
    pub fn new(timeout: Duration, policy: RetryPolicy, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// GET with retries per the client's policy.
    pub async fn get_json(&self, url: &Url, headers: &HeaderMap) -> Result<Value> {
        retry(self.policy, self.sleeper.as_ref(), || self.get_json_once(url, headers)).await
    }

    /// A single GET attempt. Non-2xx statuses become [`ScienceError::Api`].
    pub async fn get_json_once(&self, url: &Url, headers: &HeaderMap) -> Result<Value> {
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScienceError::Api {
                url: url.to_string(),
                status: status.as_u16(),
                message: body.chars().take(300).collect(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| ScienceError::Parse(e.to_string()))
    }
}

pub fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url).map_err(|e| ScienceError::Parse(format!("invalid URL {base_url}: {e}")))
}
