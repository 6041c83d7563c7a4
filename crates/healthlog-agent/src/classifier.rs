// ABOUTME: Defines the IntentClassifier trait that turns an utterance into a list of intents.
// ABOUTME: Implemented by the rule-based KeywordClassifier and by the LLM-backed provider adapters.

use async_trait::async_trait;

use crate::intent::Intent;

/// Errors a classifier can report. Fatal for the turn that hit them.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Provider unreachable: {0}")]
    Unreachable(String),
}

impl ClassifierError {
    /// Failures worth trying again: throttling, a gateway or server hiccup,
    /// or a request that never got an answer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClassifierError::RateLimited
                | ClassifierError::ServerError(500 | 502 | 503 | 504)
                | ClassifierError::Unreachable(_)
        )
    }
}

/// Splits one utterance into the intents it carries, in the order they
/// appear. An utterance with no recognizable request yields
/// `[Intent::Unrecognized]` rather than an error.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<Intent>, ClassifierError>;

    /// Classifier name for logging and display (e.g. "keyword", "anthropic").
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_problem() {
        let errors = vec![
            ClassifierError::ProviderError("timeout".to_string()),
            ClassifierError::InvalidResponse("bad json".to_string()),
            ClassifierError::RateLimited,
        ];
        let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered[0], "Provider error: timeout");
        assert_eq!(rendered[1], "Invalid response: bad json");
        assert_eq!(rendered[2], "Rate limited");
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(ClassifierError::RateLimited.is_retryable());
        assert!(ClassifierError::ServerError(503).is_retryable());
        assert!(ClassifierError::Unreachable("timed out".into()).is_retryable());
        assert!(!ClassifierError::ServerError(501).is_retryable());
        assert!(!ClassifierError::ProviderError("Unauthorized".into()).is_retryable());
        assert!(!ClassifierError::InvalidResponse("bad json".into()).is_retryable());
    }
}
