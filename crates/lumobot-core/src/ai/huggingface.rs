use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{GenerationParams, LanguageModel};
use crate::constants::{END_OF_TURN, HF_INFERENCE_BASE, REQUEST_TIMEOUT};

#[derive(Debug, Deserialize)]
struct GeneratedText {
    #[serde(default)]
    generated_text: String,
}

/// The inference API answers either with a list of generations or with an
/// `{"error": ...}` object (model loading, rate limit, bad token).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Generations(Vec<GeneratedText>),
    Error { error: String },
}

/// Wrap a prompt in the Phi-3 single-turn template
pub fn chat_template(prompt: &str) -> String {
    format!("<|user|>\n{prompt}{END_OF_TURN}\n<|assistant|>\n")
}

/// Hugging Face serverless text-generation client
pub struct HuggingFaceClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HuggingFaceClient {
    pub fn new(client: reqwest::Client, api_key: String, model: &str) -> Self {
        Self::with_endpoint(client, api_key, format!("{}/{}", HF_INFERENCE_BASE, model))
    }

    pub fn with_endpoint(client: reqwest::Client, api_key: String, endpoint: String) -> Self {
        Self {
            api_key,
            endpoint,
            client,
        }
    }
}

#[async_trait]
impl LanguageModel for HuggingFaceClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let body = serde_json::json!({
            "inputs": chat_template(prompt),
            "parameters": {
                "max_new_tokens": params.max_new_tokens,
                "temperature": params.temperature,
                "return_full_text": false,
                "stop": params.stop,
            },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Hugging Face inference API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Hugging Face inference error ({}): {}", status, error_text);
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .context("Failed to parse Hugging Face inference response")?;

        match parsed {
            InferenceResponse::Generations(generations) => {
                let first = generations
                    .into_iter()
                    .next()
                    .context("Hugging Face returned no generations")?;
                Ok(params.cut_at_stop(&first.generated_text).trim().to_string())
            }
            InferenceResponse::Error { error } => {
                anyhow::bail!("Hugging Face inference error: {}", error)
            }
        }
    }
}
