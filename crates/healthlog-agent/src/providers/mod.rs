// ABOUTME: Shared pieces for the LLM-backed classifiers: the prompt, the extraction tool schemas, and tool-call parsing.
// ABOUTME: Each sub-module adapts one provider's HTTP API to the IntentClassifier trait.

pub mod anthropic;
pub mod gemini;
#[cfg(test)]
pub(crate) mod test_server;

use std::future::Future;
use std::time::Duration;

use healthlog_core::all_tool_definitions;
use healthlog_core::tools::{ANALYZE_PATTERNS, GET_HEALTH_SUMMARY, LOG_SYMPTOM, TRACK_MEDICATION};
use serde_json::Value;

use crate::classifier::ClassifierError;
use crate::intent::{Intent, MedicationFields, PatternFields, SummaryFields, SymptomFields};

/// Instructions sent with every classification request.
pub const CLASSIFIER_PROMPT: &str = "You route messages for a personal health journal. \
     Call one tool for every separate request in the user's message, in the order they appear. \
     A message can mention a symptom and a medication at once; call both tools. \
     Fill in only what the user actually said and leave everything else out. \
     Report severities exactly as stated, even outside 1-10. \
     Give times as HH:MM in 24-hour form. \
     If the message asks for none of these things, call no tool.";

/// The tool schemas with every field optional and no range limits, so a
/// partial or out-of-range request still comes back as a call.
pub fn extraction_tools() -> Vec<Value> {
    all_tool_definitions()
        .into_iter()
        .map(|mut tool| {
            if let Some(params) = tool.get_mut("parameters").and_then(Value::as_object_mut) {
                params.remove("required");
                if let Some(props) = params.get_mut("properties").and_then(Value::as_object_mut) {
                    for prop in props.values_mut().filter_map(Value::as_object_mut) {
                        prop.remove("minimum");
                        prop.remove("maximum");
                    }
                }
            }
            tool
        })
        .collect()
}

fn text(input: &Value, key: &str) -> Option<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn count(input: &Value, key: &str) -> Option<usize> {
    input
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

/// Turn one tool call from a provider into an intent.
pub fn intent_from_tool_call(name: &str, input: &Value) -> Result<Intent, ClassifierError> {
    match name {
        LOG_SYMPTOM => Ok(Intent::Symptom(SymptomFields {
            name: text(input, "symptom_name"),
            severity: input.get("severity").filter(|v| !v.is_null()).cloned(),
            notes: text(input, "notes"),
        })),
        TRACK_MEDICATION => Ok(Intent::Medication(MedicationFields {
            name: text(input, "medication_name"),
            dosage: text(input, "dosage"),
            time_taken: text(input, "time_taken"),
        })),
        ANALYZE_PATTERNS => Ok(Intent::Pattern(PatternFields {
            window: count(input, "window"),
        })),
        GET_HEALTH_SUMMARY => Ok(Intent::Summary(SummaryFields {
            recent_medications: count(input, "recent_medications"),
        })),
        other => Err(ClassifierError::InvalidResponse(format!(
            "unknown tool: {}",
            other
        ))),
    }
}

/// Map a provider's HTTP status to a classifier error, or read the JSON body.
pub(crate) async fn read_response(
    response: reqwest::Response,
    key_var: &str,
) -> Result<Value, ClassifierError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ClassifierError::RateLimited);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ClassifierError::ProviderError(format!(
            "Unauthorized: check {}",
            key_var
        )));
    }

    if status.is_server_error() {
        return Err(ClassifierError::ServerError(status.as_u16()));
    }

    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(ClassifierError::ProviderError(format!(
            "API error {}: {}",
            status, error_body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| ClassifierError::InvalidResponse(format!("failed to parse JSON: {}", e)))
}

/// Backoff schedule for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, the first one included.
    pub attempts: u32,
    pub initial_delay: Duration,
    /// Each wait is this many times the previous one.
    pub exp_base: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_secs(1),
            exp_base: 7,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(self, attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            ..self
        }
    }

    /// Wait before retry number `retry`, counting from 1.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.exp_base.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// HTTP settings the host passes to the LLM classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierOptions {
    /// Whole-request timeout, connect through body.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ClassifierError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClassifierError::ProviderError(format!("failed to build HTTP client: {}", e)))
}

/// Read an env var and return `Some(value)` only if it is non-empty after trimming.
pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    })
}

/// Run one provider call, trying again on retryable errors with the
/// policy's backoff until it succeeds or the attempts run out.
pub(crate) async fn with_retry<F, Fut>(
    policy: &RetryPolicy,
    classifier: &str,
    mut call: F,
) -> Result<Value, ClassifierError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value, ClassifierError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Err(err) if err.is_retryable() && attempt < attempts => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    classifier,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "provider call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// No tool calls means nothing the journal can do.
pub(crate) fn or_unrecognized(intents: Vec<Intent>) -> Vec<Intent> {
    if intents.is_empty() {
        vec![Intent::Unrecognized]
    } else {
        intents
    }
}
