// ABOUTME: Anthropic Claude API adapter implementing the IntentClassifier trait.
// ABOUTME: Sends the utterance with the journal tools attached and turns each tool_use block into an intent.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::classifier::{ClassifierError, IntentClassifier};
use crate::intent::Intent;
use crate::providers::{
    CLASSIFIER_PROMPT, ClassifierOptions, RetryPolicy, extraction_tools, http_client,
    intent_from_tool_call, non_empty_env, or_unrecognized, read_response, with_retry,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Classifies utterances with the Anthropic Messages API. Each tool_use
/// block in the reply is one intent.
pub struct AnthropicClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl AnthropicClassifier {
    /// Create a new AnthropicClassifier reading configuration from environment variables.
    /// Required: `ANTHROPIC_API_KEY`
    /// Optional: `ANTHROPIC_BASE_URL` (defaults to https://api.anthropic.com)
    /// Optional: `ANTHROPIC_MODEL` (defaults to claude-sonnet-4-5-20250929)
    /// Blank values count as unset.
    pub fn from_env() -> Result<Self, ClassifierError> {
        let api_key = non_empty_env("ANTHROPIC_API_KEY")
            .ok_or_else(|| ClassifierError::ProviderError("ANTHROPIC_API_KEY not set".to_string()))?;

        let base_url =
            non_empty_env("ANTHROPIC_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = non_empty_env("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, base_url, model))
    }

    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
            retry: RetryPolicy::default(),
        }
    }

    /// Apply the host's timeout and retry settings.
    pub fn with_options(self, options: &ClassifierOptions) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: http_client(options.timeout)?,
            retry: options.retry,
            ..self
        })
    }

    pub fn with_model(self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the JSON request body for the Messages API.
    pub fn build_request_body(&self, text: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": CLASSIFIER_PROMPT,
            "messages": [{ "role": "user", "content": text }],
            "tools": build_anthropic_tools(),
            "tool_choice": { "type": "auto" }
        })
    }

    /// Parse a Messages API response into intents, one per tool_use block.
    pub fn parse_response(response_body: &Value) -> Result<Vec<Intent>, ClassifierError> {
        let content = response_body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ClassifierError::InvalidResponse("missing content array in response".to_string())
            })?;

        let mut intents = Vec::new();
        for block in content {
            if block.get("type").and_then(|t| t.as_str()) != Some("tool_use") {
                continue;
            }
            let name = block.get("name").and_then(|n| n.as_str()).ok_or_else(|| {
                ClassifierError::InvalidResponse("tool_use block missing name".to_string())
            })?;
            let input = block.get("input").cloned().unwrap_or(json!({}));
            intents.push(intent_from_tool_call(name, &input)?);
        }

        Ok(or_unrecognized(intents))
    }
}

/// Convert tool definitions to Anthropic's tool format.
fn build_anthropic_tools() -> Vec<Value> {
    extraction_tools()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.get("name").cloned().unwrap_or(Value::Null),
                "description": tool.get("description").cloned().unwrap_or(Value::Null),
                "input_schema": tool.get("parameters").cloned().unwrap_or(json!({"type": "object"}))
            })
        })
        .collect()
}

#[async_trait]
impl IntentClassifier for AnthropicClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<Intent>, ClassifierError> {
        let body = self.build_request_body(text);
        let url = format!("{}/v1/messages", self.base_url);

        let (url, body) = (&url, &body);
        let response_body = with_retry(&self.retry, "anthropic", move || async move {
            let response = self
                .client
                .post(url.as_str())
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .header("content-type", "application/json")
                .json(body)
                .send()
                .await
                .map_err(|e| ClassifierError::Unreachable(format!("HTTP request failed: {}", e)))?;
            read_response(response, "ANTHROPIC_API_KEY").await
        })
        .await?;
        let intents = Self::parse_response(&response_body)?;
        tracing::debug!(
            classifier = "anthropic",
            model = %self.model,
            intents = intents.len(),
            "classified utterance"
        );
        Ok(intents)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
