use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{GenerationParams, LanguageModel};
use crate::constants::REQUEST_TIMEOUT;

/// OpenAI-compatible chat completions client (OpenRouter, Lumo, ...)
pub struct ChatCompletionsClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        model: &str,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.to_string(),
            client,
        }
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "max_tokens": params.max_new_tokens,
            "temperature": params.temperature,
            "stop": params.stop,
        });

        let mut request = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .json(&body)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion error ({}): {}", status, error_text);
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .context("Failed to extract message content from response")?;

        Ok(params.cut_at_stop(content).trim().to_string())
    }
}
