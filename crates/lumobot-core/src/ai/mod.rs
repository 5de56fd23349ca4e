pub mod chat;
pub mod huggingface;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{LlmConfig, LlmProvider};
use crate::constants::{END_OF_TURN, GENERATION_MAX_NEW_TOKENS, GENERATION_TEMPERATURE};

pub use chat::ChatCompletionsClient;
pub use huggingface::HuggingFaceClient;

/// Sampling settings passed with every completion request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: GENERATION_MAX_NEW_TOKENS,
            temperature: GENERATION_TEMPERATURE,
            stop: vec![END_OF_TURN.to_string()],
        }
    }
}

impl GenerationParams {
    /// Cut `text` at the first stop marker, for backends that echo it
    pub fn cut_at_stop<'a>(&self, text: &'a str) -> &'a str {
        self.stop
            .iter()
            .filter(|marker| !marker.is_empty())
            .filter_map(|marker| text.find(marker.as_str()))
            .min()
            .map_or(text, |idx| &text[..idx])
    }
}

/// Text-completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

/// Build the backend selected in config
pub fn from_config(config: &LlmConfig, http: reqwest::Client) -> Box<dyn LanguageModel> {
    match config.provider {
        LlmProvider::Huggingface => Box::new(HuggingFaceClient::new(
            http,
            config.api_key.clone().unwrap_or_default(),
            config.model(),
        )),
        LlmProvider::Chat => Box::new(ChatCompletionsClient::new(
            http,
            config.base_url(),
            config.api_key.clone(),
            config.model(),
        )),
    }
}
