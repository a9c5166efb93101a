use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::models::PipelineStage;

/// Root application configuration, loaded from `~/.config/paperlens/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub explorer: ExplorerConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub default_limit: usize,
}

/// Pacing between stages. Each entry declares the minimum pause inserted
/// after the named stage completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stage_gaps: Vec<StageGap>,
    pub related_work_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageGap {
    pub after: PipelineStage,
    pub gap_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
            temperature: 0.2,
            max_output_tokens: 2048,
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            api_key_env: "SEMANTIC_SCHOLAR_API_KEY".to_string(),
            timeout_secs: 10,
            max_retries: 2,
            backoff_base_ms: 1000,
            default_limit: 10,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_gaps: vec![
                StageGap {
                    after: PipelineStage::MetadataRefining,
                    gap_ms: 2000,
                },
                StageGap {
                    after: PipelineStage::Summarizing,
                    gap_ms: 1000,
                },
            ],
            related_work_limit: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("paperlens");
        Self {
            database_path: data_dir.join("papers.db").to_string_lossy().to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

// ─── Accessors ─────────────────────────────────────────────

impl AiConfig {
    /// API key read from the environment variable named by `api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        read_env_key(&self.api_key_env)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ExplorerConfig {
    pub fn api_key(&self) -> Option<String> {
        read_env_key(&self.api_key_env)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl PipelineConfig {
    /// Configured pause after `stage`; zero when none is declared. When a
    /// stage is listed twice the longest gap wins.
    pub fn gap_after(&self, stage: PipelineStage) -> Duration {
        self.stage_gaps
            .iter()
            .filter(|gap| gap.after == stage)
            .map(|gap| Duration::from_millis(gap.gap_ms))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Same stage list with every gap removed.
    pub fn without_gaps(mut self) -> Self {
        self.stage_gaps.clear();
        self
    }
}

fn read_env_key(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/paperlens/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PAPERLENS_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("paperlens")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_path.trim().is_empty() {
            return Err(CoreError::ConfigError("storage.database_path is empty".to_string()));
        }
        if self.upload.max_bytes == 0 {
            return Err(CoreError::ConfigError("upload.max_bytes must be positive".to_string()));
        }
        if self.explorer.default_limit == 0 || self.pipeline.related_work_limit == 0 {
            return Err(CoreError::ConfigError(
                "related-work limits must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.database_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ai.provider, "gemini");
        assert_eq!(cfg.explorer.timeout_secs, 10);
        assert_eq!(cfg.explorer.max_retries, 2);
        assert_eq!(cfg.upload.max_bytes, 10 * 1024 * 1024);
        assert!(!cfg.storage.database_path.is_empty());
    }

    #[test]
    fn test_default_gaps_pace_the_model_calls() {
        let cfg = PipelineConfig::default();
        assert_eq!(
            cfg.gap_after(PipelineStage::MetadataRefining),
            Duration::from_secs(2)
        );
        assert_eq!(cfg.gap_after(PipelineStage::Summarizing), Duration::from_secs(1));
        assert_eq!(cfg.gap_after(PipelineStage::Extracting), Duration::ZERO);
        assert_eq!(
            cfg.without_gaps().gap_after(PipelineStage::MetadataRefining),
            Duration::ZERO
        );
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = AppConfig::default();
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.ai.model, cfg.ai.model);
        assert_eq!(loaded.pipeline.stage_gaps, cfg.pipeline.stage_gaps);
        assert_eq!(loaded.explorer.base_url, cfg.explorer.base_url);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[pipeline]
stage_gaps = [{ after = "keyword_extracting", gap_ms = 500 }]

[explorer]
max_retries = 4
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.explorer.max_retries, 4);
        assert_eq!(cfg.explorer.timeout_secs, 10);
        assert_eq!(
            cfg.pipeline.gap_after(PipelineStage::KeywordExtracting),
            Duration::from_millis(500)
        );
        assert_eq!(
            cfg.pipeline.gap_after(PipelineStage::MetadataRefining),
            Duration::ZERO
        );
        assert_eq!(cfg.pipeline.related_work_limit, 10);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg =
            AppConfig::load_from(Path::new("/tmp/nonexistent_paperlens_config.toml")).unwrap();
        assert_eq!(cfg.ai.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_zero_upload_limit_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[upload]\nmax_bytes = 0\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn test_blank_env_name_yields_no_key() {
        let cfg = AiConfig {
            api_key_env: String::new(),
            ..AiConfig::default()
        };
        assert_eq!(cfg.api_key(), None);
    }
}
