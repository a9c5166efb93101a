//! Generative model abstraction and the Gemini backend.
//!
//! The enrichment client only needs "prompt in, text out"; everything
//! provider-specific (auth, safety settings, error shapes) stays here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use paperlens_core::AiConfig;
use serde_json::{Value, json};

use crate::error::ModelError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// One synchronous request/response round trip.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
    fn model_id(&self) -> &str;
}

/// Legacy model names (`*1.5*`, `*exp*`) are no longer served; they are
/// mapped onto [`DEFAULT_MODEL`].
pub fn normalize_model_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_MODEL.to_string();
    }
    if trimmed.contains("1.5") || trimmed.contains("exp") {
        tracing::warn!(
            requested = trimmed,
            replacement = DEFAULT_MODEL,
            "legacy model requested, switching"
        );
        return DEFAULT_MODEL.to_string();
    }
    trimmed.to_string()
}

/// Builds the configured backend.
pub fn model_from_config(config: &AiConfig) -> Result<GeminiModel, ModelError> {
    match config.provider.trim().to_ascii_lowercase().as_str() {
        "gemini" | "google" => GeminiModel::from_config(config),
        other => Err(ModelError::UnsupportedProvider(other.to_string())),
    }
}

/// Like [`model_from_config`], except that a missing API key installs an
/// [`UnavailableModel`] so uploads still run with every AI stage degraded.
pub fn resolve_model(config: &AiConfig) -> Result<Arc<dyn GenerativeModel>, ModelError> {
    match model_from_config(config) {
        Ok(model) => Ok(Arc::new(model)),
        Err(ModelError::MissingApiKey(env)) => {
            tracing::warn!(%env, "no API key configured, AI enrichment will use fallbacks");
            Ok(Arc::new(UnavailableModel::new(&config.model, env)))
        }
        Err(err) => Err(err),
    }
}

// ── Unavailable ───────────────────────────────────────────────────────────────

/// Backend for a provider without credentials. Every call fails with
/// [`ModelError::MissingApiKey`].
pub struct UnavailableModel {
    model: String,
    api_key_env: String,
}

impl UnavailableModel {
    pub fn new(model: &str, api_key_env: impl Into<String>) -> Self {
        Self {
            model: normalize_model_name(model),
            api_key_env: api_key_env.into(),
        }
    }
}

#[async_trait]
impl GenerativeModel for UnavailableModel {
    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::MissingApiKey(self.api_key_env.clone()))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── Google Gemini ─────────────────────────────────────────────────────────────

pub struct GeminiModel {
    model: String,
    api_key: String,
    base_url: String,
    temperature: f64,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: &str, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .user_agent("paperlens/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            model: normalize_model_name(model),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.2,
            max_output_tokens: 2048,
            client,
        })
    }

    pub fn from_config(config: &AiConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| ModelError::MissingApiKey(config.api_key_env.clone()))?;
        let mut model = Self::new(api_key, &config.model, config.timeout())?;
        if !config.base_url.trim().is_empty() {
            model.base_url = config.base_url.trim_end_matches('/').to_string();
        }
        model.temperature = config.temperature;
        model.max_output_tokens = config.max_output_tokens;
        Ok(model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, prompt: &str) -> Value {
        let safety: Vec<Value> = HARM_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
            .collect();

        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
            "safetySettings": safety,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "gemini request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        if status >= 400 {
            return Err(classify_error(status, &json, &body));
        }

        extract_text(&json).ok_or(ModelError::EmptyResponse)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn classify_error(status: u16, json: &Value, raw: &str) -> ModelError {
    let message = json["error"]["message"]
        .as_str()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| raw.chars().take(300).collect());
    let provider_status = json["error"]["status"].as_str().unwrap_or_default();

    if status == 429 || provider_status == "RESOURCE_EXHAUSTED" {
        ModelError::RateLimited { status, message }
    } else {
        ModelError::Api { status, message }
    }
}

fn extract_text(json: &Value) -> Option<String> {
    let parts = json["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
