// ABOUTME: Configuration loading for the healthlog binary from HEALTHLOG_* environment variables.
// ABOUTME: Supplies the data directory, classifier choice and HTTP options, session TTL, and handler options.

use std::path::PathBuf;
use std::time::Duration;

use healthlog_agent::{ClassifierOptions, DEFAULT_SESSION_TTL, HandlerConfig, RetryPolicy};
use healthlog_core::DEFAULT_RECENT_MEDICATIONS;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

/// Binary configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct HealthlogConfig {
    pub home: PathBuf,
    pub classifier: String,
    pub model: Option<String>,
    pub classifier_timeout: Duration,
    pub classifier_attempts: u32,
    pub session_ttl: Duration,
    pub summary_medications: usize,
    pub ask_for_notes: bool,
    pub persist: bool,
}

impl HealthlogConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - HEALTHLOG_HOME: data directory (default: ~/.healthlog)
    /// - HEALTHLOG_CLASSIFIER: keyword, anthropic or gemini (default: keyword)
    /// - HEALTHLOG_MODEL: model name for LLM classifiers (optional)
    /// - HEALTHLOG_CLASSIFIER_TIMEOUT_SECS: per-request timeout for LLM classifiers (default: 30)
    /// - HEALTHLOG_CLASSIFIER_ATTEMPTS: tries per LLM call on rate limits and server errors (default: 5)
    /// - HEALTHLOG_SESSION_TTL_SECS: idle seconds before pending questions lapse (default: 1800)
    /// - HEALTHLOG_SUMMARY_MEDICATIONS: medications listed in a summary (default: 5)
    /// - HEALTHLOG_ASK_NOTES: ask for notes before logging a symptom (default: false)
    /// - HEALTHLOG_PERSIST: keep the journal on disk (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = std::env::var("HEALTHLOG_HOME")
            .ok()
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".healthlog")
            });

        let classifier = std::env::var("HEALTHLOG_CLASSIFIER")
            .ok()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "keyword".to_string());

        let model = std::env::var("HEALTHLOG_MODEL").ok().filter(|m| !m.is_empty());

        let defaults = ClassifierOptions::default();
        let classifier_timeout = positive("HEALTHLOG_CLASSIFIER_TIMEOUT_SECS")?
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(defaults.timeout);
        let classifier_attempts = positive("HEALTHLOG_CLASSIFIER_ATTEMPTS")?
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(defaults.retry.attempts);

        let ttl_secs = positive("HEALTHLOG_SESSION_TTL_SECS")?
            .map(|secs| secs as u64)
            .unwrap_or(DEFAULT_SESSION_TTL.as_secs());

        let summary_medications =
            positive("HEALTHLOG_SUMMARY_MEDICATIONS")?.unwrap_or(DEFAULT_RECENT_MEDICATIONS);

        Ok(Self {
            home,
            classifier,
            model,
            classifier_timeout,
            classifier_attempts,
            session_ttl: Duration::from_secs(ttl_secs),
            summary_medications,
            ask_for_notes: flag("HEALTHLOG_ASK_NOTES", false),
            persist: flag("HEALTHLOG_PERSIST", true),
        })
    }

    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions {
            timeout: self.classifier_timeout,
            retry: RetryPolicy::default().with_attempts(self.classifier_attempts),
        }
    }

    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            ask_for_notes: self.ask_for_notes,
            recent_medications: self.summary_medications,
        }
    }
}

fn flag(var: &str, default: bool) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn positive(var: &'static str) -> Result<Option<usize>, ConfigError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(None);
    };
    let value: usize = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.clone(),
    })?;
    if value == 0 {
        return Err(ConfigError::Zero { var });
    }
    Ok(Some(value))
}
