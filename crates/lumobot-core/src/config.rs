use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHAT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_DELAY_MAX_SECS, DEFAULT_DELAY_MIN_SECS,
    DEFAULT_HF_MODEL, DEFAULT_NOTIFICATION_LIMIT, DEFAULT_SERVICE_URL, PAUSE_MARKER,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("either accessToken (BLUESKY_TOKEN) or appPassword (BLUESKY_APP_PASSWORD) is required")]
    MissingCredentials,
    #[error("delay.minSecs ({min}) is greater than delay.maxSecs ({max})")]
    InvalidDelay { min: u64, max: u64 },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Hugging Face serverless text-generation
    #[default]
    Huggingface,
    /// OpenAI-compatible `/chat/completions` (OpenRouter, Lumo, ...)
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Only used by the chat provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model.as_str(),
            (None, LlmProvider::Huggingface) => DEFAULT_HF_MODEL,
            (None, LlmProvider::Chat) => DEFAULT_CHAT_MODEL,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_CHAT_BASE_URL)
    }
}

/// Randomized pause between consecutive replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayConfig {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_secs: DEFAULT_DELAY_MIN_SECS,
            max_secs: DEFAULT_DELAY_MAX_SECS,
        }
    }
}

impl DelayConfig {
    pub fn none() -> Self {
        Self {
            min_secs: 0,
            max_secs: 0,
        }
    }

    pub fn range(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.min_secs),
            Duration::from_secs(self.max_secs),
        )
    }
}

/// Bot configuration, loaded from an optional JSON file and then overridden
/// by environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,

    /// Pre-issued session token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// App password used with `botHandle` to create a session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_password: Option<String>,

    #[serde(default)]
    pub bot_handle: String,

    #[serde(default)]
    pub bot_did: String,

    /// The only account whose posts the bot acts on
    #[serde(default)]
    pub owner_did: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub delay: DelayConfig,

    /// Stop generating once this many model calls were made this month
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_quota: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_limit: Option<u32>,
}

impl BotConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: BotConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// File (if any) + process environment, validated
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BLUESKY_SERVICE") {
            self.service_url = Some(v);
        }
        if let Some(v) = get("BLUESKY_TOKEN") {
            self.access_token = Some(v);
        }
        if let Some(v) = get("BLUESKY_APP_PASSWORD") {
            self.app_password = Some(v);
        }
        if let Some(v) = get("BOT_HANDLE") {
            self.bot_handle = v;
        }
        if let Some(v) = get("BOT_DID") {
            self.bot_did = v;
        }
        if let Some(v) = get("OWNER_DID") {
            self.owner_did = v;
        }
        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = match v.to_lowercase().as_str() {
                "huggingface" | "hf" => LlmProvider::Huggingface,
                "chat" | "openrouter" | "lumo" => LlmProvider::Chat,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "LLM_PROVIDER",
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = Some(v);
        }
        if let Some(v) = get("LLM_API_KEY").or_else(|| get("HF_TOKEN")) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = get("LUMOBOT_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("LUMOBOT_MONTHLY_QUOTA") {
            let quota = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "LUMOBOT_MONTHLY_QUOTA",
                value: v.clone(),
            })?;
            self.monthly_quota = Some(quota);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn present(value: &str) -> bool {
            !value.trim().is_empty()
        }

        if !present(&self.bot_handle) {
            return Err(ConfigError::Missing("botHandle (BOT_HANDLE)"));
        }
        if !present(&self.bot_did) {
            return Err(ConfigError::Missing("botDid (BOT_DID)"));
        }
        if !present(&self.owner_did) {
            return Err(ConfigError::Missing("ownerDid (OWNER_DID)"));
        }

        let has_token = self.access_token.as_deref().is_some_and(present);
        let has_password = self.app_password.as_deref().is_some_and(present);
        if !has_token && !has_password {
            return Err(ConfigError::MissingCredentials);
        }

        if self.llm.provider == LlmProvider::Huggingface
            && !self.llm.api_key.as_deref().is_some_and(present)
        {
            return Err(ConfigError::Missing("llm.apiKey (HF_TOKEN)"));
        }

        if self.delay.min_secs > self.delay.max_secs {
            return Err(ConfigError::InvalidDelay {
                min: self.delay.min_secs,
                max: self.delay.max_secs,
            });
        }
        Ok(())
    }

    pub fn service_url(&self) -> &str {
        self.service_url.as_deref().unwrap_or(DEFAULT_SERVICE_URL)
    }

    pub fn notification_limit(&self) -> u32 {
        self.notification_limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// True when an operator paused the bot by dropping a marker file
    pub fn is_paused(&self) -> bool {
        self.data_dir().join(PAUSE_MARKER).exists()
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lumobot")
}
