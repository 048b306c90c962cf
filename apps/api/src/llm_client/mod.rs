/// LLM Client: the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All AI interactions go through this module and its `AiBackend` impl.
///
/// Every call passes the shared `RateGate` first and is attempted exactly once.
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod backend;
pub mod prompts;
pub mod rate_gate;

pub use backend::{AiBackend, AiIntent, AnswerContext};
pub use rate_gate::{RateGate, UsageStats};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used for answer composition.
pub const MODEL: &str = "claude-sonnet-4-5";
/// Lighter model used for intent classification.
pub const CLASSIFIER_MODEL: &str = "claude-haiku-4-5";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum AiServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Daily budget exhausted (${spent:.2} of ${budget:.2})")]
    BudgetExhausted { spent: f64, budget: f64 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Per-call generation settings.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CallOptions<'static> {
    pub const ANSWER: CallOptions<'static> = CallOptions {
        model: MODEL,
        max_tokens: 1000,
        temperature: 0.3,
    };

    pub const CLASSIFY: CallOptions<'static> = CallOptions {
        model: CLASSIFIER_MODEL,
        max_tokens: 200,
        temperature: 0.1,
    };
}

/// Wraps the Anthropic Messages API with admission control and structured
/// output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    gate: Arc<RateGate>,
}

impl LlmClient {
    pub fn new(api_key: String, gate: Arc<RateGate>) -> Result<Self, AiServiceError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            gate,
        })
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Makes one call to the Claude API, returning the full response object.
    /// Rejected up front when the rate window or daily budget is exhausted.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        options: CallOptions<'_>,
    ) -> Result<LlmResponse, AiServiceError> {
        self.gate.try_acquire()?;

        let request_body = AnthropicRequest {
            model: options.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AiServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;
        let usage = &llm_response.usage;
        self.gate.record_usage(
            u64::from(usage.input_tokens + usage.output_tokens),
            estimate_cost_usd(options.model, usage),
        );

        debug!(
            "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
            options.model, usage.input_tokens, usage.output_tokens
        );

        Ok(llm_response)
    }

    /// Calls the LLM and returns the trimmed text of the first text block.
    pub async fn call_text(
        &self,
        prompt: &str,
        system: &str,
        options: CallOptions<'_>,
    ) -> Result<String, AiServiceError> {
        let response = self.call(prompt, system, options).await?;
        let text = response.text().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(AiServiceError::EmptyContent);
        }
        Ok(text.to_string())
    }

    /// Convenience method that calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        options: CallOptions<'_>,
    ) -> Result<T, AiServiceError> {
        let text = self.call_text(prompt, system, options).await?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(&text);

        serde_json::from_str(text).map_err(AiServiceError::Parse)
    }
}

/// Rough USD cost of a call from list prices per million tokens.
pub fn estimate_cost_usd(model: &str, usage: &Usage) -> f64 {
    let (input_per_m, output_per_m) = if model == CLASSIFIER_MODEL {
        (1.0, 5.0)
    } else {
        (3.0, 15.0)
    };
    (f64::from(usage.input_tokens) * input_per_m + f64::from(usage.output_tokens) * output_per_m)
        / 1_000_000.0
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_cost_estimate_uses_model_rates() {
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 0,
        };
        assert!((estimate_cost_usd(MODEL, &usage) - 3.0).abs() < 1e-9);
        assert!((estimate_cost_usd(CLASSIFIER_MODEL, &usage) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let json = r#"{
            "content": [
                {"type": "tool_use", "text": null},
                {"type": "text", "text": "回答です"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("回答です"));
    }

    #[tokio::test]
    async fn test_exhausted_gate_rejects_before_network() {
        let gate = Arc::new(RateGate::new(0, 10.0));
        let client = LlmClient::new("test-key".to_string(), gate).unwrap();
        let result = client.call("hi", "system", CallOptions::CLASSIFY).await;
        assert!(matches!(result, Err(AiServiceError::RateLimited(_))));
    }
}
