use super::ObservabilityConfig;
use crate::error::ConfigError;
use crate::providers::DEFAULT_TIMEOUT_SECS;
use crate::session::{DEFAULT_HISTORY_WINDOW, DEFAULT_PASSAGES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub(super) const DATA_DIR_NAME: &str = ".adaptive-agent";
const HISTORY_FILE_NAME: &str = "policy_history.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory, computed from home, not serialized
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Path to config.toml, computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "openai" | "openrouter" | "groq" | "mistral" | "deepseek" | "together" | "ollama" | "custom"
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Required for "custom"; overrides the built-in URL otherwise.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ask the provider for JSON-only replies on evaluator and routing calls.
    #[serde(default)]
    pub json_mode: bool,
}

fn default_provider_name() -> String {
    "openai".into()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            json_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Falls back to `model`.
    #[serde(default)]
    pub evaluator_model: Option<String>,
    /// Falls back to `evaluator_model`, then `model`.
    #[serde(default)]
    pub routing_model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f64,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_chat_temperature() -> f64 {
    0.3
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            evaluator_model: None,
            routing_model: None,
            temperature: default_temperature(),
            chat_temperature: default_chat_temperature(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Defaults to `policy_history.json` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Passages retrieved per message when a document is attached.
    #[serde(default = "default_passages")]
    pub passages: usize,
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_passages() -> usize {
    DEFAULT_PASSAGES
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            passages: default_passages(),
        }
    }
}

impl Config {
    pub fn history_path(&self) -> PathBuf {
        self.history
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(HISTORY_FILE_NAME))
    }

    pub fn evaluator_model(&self) -> &str {
        self.models
            .evaluator_model
            .as_deref()
            .unwrap_or(&self.models.model)
    }

    pub fn routing_model(&self) -> &str {
        self.models
            .routing_model
            .as_deref()
            .unwrap_or_else(|| self.evaluator_model())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, temp) in [
            ("models.temperature", self.models.temperature),
            ("models.chat_temperature", self.models.chat_temperature),
        ] {
            if !(0.0..=2.0).contains(&temp) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be between 0.0 and 2.0, got {temp}"
                )));
            }
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "provider.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.models.model.trim().is_empty() {
            return Err(ConfigError::Validation("models.model must not be empty".into()));
        }
        if self.observability.level().is_none() {
            return Err(ConfigError::Validation(format!(
                "observability.log_level {:?} is not a tracing level",
                self.observability.log_level
            )));
        }
        Ok(())
    }
}
