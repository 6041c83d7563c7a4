// ABOUTME: Factory for building an IntentClassifier from a classifier name and optional model.
// ABOUTME: LLM-backed classifiers resolve keys and models from the environment and take the host's HTTP options.

use std::sync::Arc;

use crate::classifier::IntentClassifier;
use crate::keyword::KeywordClassifier;
use crate::providers::ClassifierOptions;
use crate::providers::anthropic::AnthropicClassifier;
use crate::providers::gemini::GeminiClassifier;

/// Create the classifier named `name`.
///
/// For LLM classifiers the model is resolved from:
/// 1. The explicit `model` parameter (if Some)
/// 2. A provider-specific environment variable (e.g. ANTHROPIC_MODEL)
/// 3. The provider default
///
/// `options` sets their HTTP timeout and retry schedule; the keyword
/// classifier ignores it.
pub fn create_classifier(
    name: &str,
    model: Option<&str>,
    options: &ClassifierOptions,
) -> Result<Arc<dyn IntentClassifier>, anyhow::Error> {
    match name {
        "keyword" => Ok(Arc::new(KeywordClassifier::new())),
        "anthropic" => {
            let mut classifier = AnthropicClassifier::from_env()?.with_options(options)?;
            if let Some(model) = model {
                classifier = classifier.with_model(model);
            }
            log_llm_choice(name, classifier.model(), options);
            Ok(Arc::new(classifier))
        }
        "gemini" => {
            let mut classifier = GeminiClassifier::from_env()?.with_options(options)?;
            if let Some(model) = model {
                classifier = classifier.with_model(model);
            }
            log_llm_choice(name, classifier.model(), options);
            Ok(Arc::new(classifier))
        }
        unknown => Err(anyhow::anyhow!("unsupported classifier: {}", unknown)),
    }
}

fn log_llm_choice(name: &str, model: &str, options: &ClassifierOptions) {
    tracing::info!(
        classifier = name,
        model,
        timeout_secs = options.timeout.as_secs(),
        attempts = options.retry.attempts,
        "using LLM classifier"
    );
}
