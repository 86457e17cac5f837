use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_raw_path")]
    pub raw_path: PathBuf,
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            raw_path: default_raw_path(),
            history_path: default_history_path(),
        }
    }
}

fn default_raw_path() -> PathBuf {
    PathBuf::from("data/daily_reviews_batch.csv")
}
fn default_history_path() -> PathBuf {
    PathBuf::from("data/review_history.csv")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: default_model(),
            url: None,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "mistral-large-latest".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl ClassifierConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Fallback date for a simulate request that names no date.
    #[serde(default = "default_simulation_date")]
    pub default_date: NaiveDate,
    /// How many of the most recent history rows the chat prompt carries.
    #[serde(default = "default_chat_context_rows")]
    pub chat_context_rows: usize,
    /// What re-running an already simulated date does: "append" accumulates
    /// duplicate rows, "replace" removes that date's rows first.
    #[serde(default = "default_resimulate")]
    pub resimulate: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_date: default_simulation_date(),
            chat_context_rows: 100,
            resimulate: "append".to_string(),
        }
    }
}

fn default_simulation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 7).unwrap()
}
fn default_chat_context_rows() -> usize {
    100
}
fn default_resimulate() -> String {
    "append".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self {
            storage: StorageConfig::default(),
            classifier: ClassifierConfig::default(),
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate classifier
    match config.classifier.provider.as_str() {
        "disabled" | "mistral" => {}
        other => anyhow::bail!(
            "Unknown classifier provider: '{}'. Must be mistral or disabled.",
            other
        ),
    }

    if config.classifier.is_enabled() && config.classifier.model.trim().is_empty() {
        anyhow::bail!(
            "classifier.model must be specified when provider is '{}'",
            config.classifier.provider
        );
    }

    // Validate pipeline
    if config.pipeline.chat_context_rows < 1 {
        anyhow::bail!("pipeline.chat_context_rows must be >= 1");
    }

    match config.pipeline.resimulate.as_str() {
        "append" | "replace" => {}
        other => anyhow::bail!(
            "Unknown resimulate mode: '{}'. Must be append or replace.",
            other
        ),
    }

    Ok(config)
}
