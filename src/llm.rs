//! LLM provider abstraction: builds HTTP requests and normalizes responses
//! for both Anthropic and OpenAI-compatible APIs.

use serde_json::Value;

use crate::error::EngineError;
use crate::settings::{LlmProvider, LlmProviderConfig};

const MAX_TOKENS: u32 = 4096;

/// Resolved provider details ready for making an API call.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub provider: LlmProvider,
}

impl ResolvedProvider {
    /// Resolve a provider config into concrete URL / key / model values.
    pub fn from_config(config: &LlmProviderConfig, api_key: Option<&str>) -> Result<Self, EngineError> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EngineError::InferenceUnavailable {
                message: "No API key configured".to_string(),
            })?
            .to_string();

        match config.provider {
            LlmProvider::Anthropic => Ok(Self {
                url: "https://api.anthropic.com/v1/messages".to_string(),
                api_key,
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string()),
                provider: LlmProvider::Anthropic,
            }),
            LlmProvider::OpenAiCompatible => {
                let base = config
                    .base_url
                    .as_deref()
                    .unwrap_or("https://api.openai.com/v1");
                let base = base.trim_end_matches('/');
                Ok(Self {
                    url: format!("{base}/chat/completions"),
                    api_key,
                    model: config
                        .model
                        .clone()
                        .unwrap_or_else(|| "gpt-4o".to_string()),
                    provider: LlmProvider::OpenAiCompatible,
                })
            }
        }
    }
}

/// Build a single-turn completion request for the resolved provider.
pub fn build_request(
    client: &reqwest::Client,
    provider: &ResolvedProvider,
    system_prompt: &str,
    prompt: &str,
) -> reqwest::RequestBuilder {
    match provider.provider {
        LlmProvider::Anthropic => {
            let body = serde_json::json!({
                "model": provider.model,
                "max_tokens": MAX_TOKENS,
                "system": system_prompt,
                "messages": [{ "role": "user", "content": prompt }],
            });
            client
                .post(&provider.url)
                .header("x-api-key", &provider.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&body)
        }
        LlmProvider::OpenAiCompatible => {
            let body = serde_json::json!({
                "model": provider.model,
                "max_tokens": MAX_TOKENS,
                "messages": [
                    { "role": "system", "content": system_prompt },
                    { "role": "user", "content": prompt },
                ],
            });
            client
                .post(&provider.url)
                .header("Authorization", format!("Bearer {}", provider.api_key))
                .header("content-type", "application/json")
                .json(&body)
        }
    }
}

/// Pull the generated text out of a provider response.
pub fn parse_response_text(provider: LlmProvider, json: &Value) -> Result<String, EngineError> {
    let text = match provider {
        // Anthropic: concatenate every text block
        LlmProvider::Anthropic => json
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n")
            }),
        LlmProvider::OpenAiCompatible => json
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(ToString::to_string),
    };

    text.filter(|t| !t.trim().is_empty())
        .ok_or_else(|| EngineError::Inference {
            message: "Model returned no text".to_string(),
        })
}

/// Find the outermost JSON object in model output (models often wrap JSON in prose or fences).
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}
