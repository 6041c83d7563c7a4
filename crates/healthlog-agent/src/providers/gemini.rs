// ABOUTME: Google Gemini API adapter implementing the IntentClassifier trait.
// ABOUTME: Sends the utterance with function declarations and turns each functionCall part into an intent.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::classifier::{ClassifierError, IntentClassifier};
use crate::intent::Intent;
use crate::providers::{
    CLASSIFIER_PROMPT, ClassifierOptions, RetryPolicy, extraction_tools, http_client,
    intent_from_tool_call, non_empty_env, or_unrecognized, read_response, with_retry,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const MAX_TOKENS: u32 = 1024;

/// Classifies utterances with the Gemini generateContent API.
pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl GeminiClassifier {
    /// Create a new GeminiClassifier reading configuration from environment variables.
    /// Required: `GEMINI_API_KEY`
    /// Optional: `GEMINI_BASE_URL`, `GEMINI_MODEL` (defaults to gemini-2.0-flash)
    /// Blank values count as unset.
    pub fn from_env() -> Result<Self, ClassifierError> {
        let api_key = non_empty_env("GEMINI_API_KEY")
            .ok_or_else(|| ClassifierError::ProviderError("GEMINI_API_KEY not set".to_string()))?;

        let base_url =
            non_empty_env("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = non_empty_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

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

    /// Build the JSON request body for the generateContent API.
    pub fn build_request_body(&self, text: &str) -> Value {
        json!({
            "system_instruction": {
                "parts": [{"text": CLASSIFIER_PROMPT}]
            },
            "contents": [{
                "role": "user",
                "parts": [{"text": text}]
            }],
            "tools": [{"function_declarations": extraction_tools()}],
            "generation_config": {
                "max_output_tokens": MAX_TOKENS
            }
        })
    }

    /// Parse a generateContent response into intents, one per functionCall part.
    pub fn parse_response(response_body: &Value) -> Result<Vec<Intent>, ClassifierError> {
        let candidate = response_body
            .get("candidates")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ClassifierError::InvalidResponse("missing candidates array in response".to_string())
            })?
            .first()
            .ok_or_else(|| ClassifierError::InvalidResponse("empty candidates array".to_string()))?;

        // A candidate with no content at all (e.g. finishReason SAFETY) carries no calls.
        let Some(parts) = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
        else {
            return Ok(vec![Intent::Unrecognized]);
        };

        let mut intents = Vec::new();
        for function_call in parts.iter().filter_map(|part| part.get("functionCall")) {
            let name = function_call
                .get("name")
                .and_then(|n| n.as_str())
                .ok_or_else(|| {
                    ClassifierError::InvalidResponse("functionCall missing name".to_string())
                })?;
            let args = function_call.get("args").cloned().unwrap_or(json!({}));
            intents.push(intent_from_tool_call(name, &args)?);
        }

        Ok(or_unrecognized(intents))
    }
}

#[async_trait]
impl IntentClassifier for GeminiClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<Intent>, ClassifierError> {
        let body = self.build_request_body(text);
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let (url, body) = (&url, &body);
        let response_body = with_retry(&self.retry, "gemini", move || async move {
            let response = self
                .client
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await
                .map_err(|e| {
                    // The URL carries the API key.
                    ClassifierError::Unreachable(format!("HTTP request failed: {}", e.without_url()))
                })?;
            read_response(response, "GEMINI_API_KEY").await
        })
        .await?;
        let intents = Self::parse_response(&response_body)?;
        tracing::debug!(
            classifier = "gemini",
            model = %self.model,
            intents = intents.len(),
            "classified utterance"
        );
        Ok(intents)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
