// ABOUTME: Shared contract for the four specialist handlers and the outcomes they report.
// ABOUTME: A handler either asks for exactly one missing field or calls its tool and reports the ToolResult.

pub mod medication;
pub mod pattern;
pub mod summary;
pub mod symptom;

use async_trait::async_trait;
use healthlog_core::{DEFAULT_RECENT_MEDICATIONS, Field, StorageUnavailable, ToolResult};
use serde::{Deserialize, Serialize};

use crate::intent::HandlerKind;

pub use medication::MedicationHandler;
pub use pattern::PatternHandler;
pub use summary::SummaryHandler;
pub use symptom::SymptomHandler;

/// Knobs shared by the handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Ask once for optional symptom notes before logging.
    pub ask_for_notes: bool,
    /// Medications listed in a summary when the request does not say.
    pub recent_medications: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            ask_for_notes: false,
            recent_medications: DEFAULT_RECENT_MEDICATIONS,
        }
    }
}

/// A request for one field, carrying the partial fields to resume from.
#[derive(Debug, Clone, PartialEq)]
pub struct Clarification<F> {
    pub fields: F,
    pub field: Field,
    pub question: String,
    pub error: Option<String>,
}

/// What one handler call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerStep<F> {
    /// The tool ran. The result may still be an error that names no field.
    Done(ToolResult),
    /// A field is missing or was rejected.
    Ask(Clarification<F>),
}

/// The part of a handler step that is shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandlerOutcome {
    Completed {
        result: ToolResult,
    },
    Clarification {
        field: Field,
        question: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl HandlerOutcome {
    /// Text for this outcome inside a reply.
    pub fn text(&self) -> &str {
        match self {
            HandlerOutcome::Completed { result } => &result.message,
            HandlerOutcome::Clarification { question, .. } => question,
        }
    }

    pub fn tool_result(&self) -> Option<&ToolResult> {
        match self {
            HandlerOutcome::Completed { result } => Some(result),
            HandlerOutcome::Clarification { .. } => None,
        }
    }
}

impl<F> From<&HandlerStep<F>> for HandlerOutcome {
    fn from(step: &HandlerStep<F>) -> Self {
        match step {
            HandlerStep::Done(result) => HandlerOutcome::Completed {
                result: result.clone(),
            },
            HandlerStep::Ask(c) => HandlerOutcome::Clarification {
                field: c.field,
                question: c.question.clone(),
                error: c.error.clone(),
            },
        }
    }
}

/// One specialist. `Fields` is the partial input it works from.
#[async_trait]
pub trait SpecialistHandler: Send + Sync {
    type Fields: Send + 'static;

    fn kind(&self) -> HandlerKind;

    async fn handle(
        &self,
        fields: Self::Fields,
    ) -> Result<HandlerStep<Self::Fields>, StorageUnavailable>;
}

/// Build a clarification, putting a rejection message in front of the
/// question when there is one.
pub(crate) fn ask<F>(fields: F, field: Field, question: String, error: Option<String>) -> HandlerStep<F> {
    let question = match &error {
        Some(err) => format!("{} {}", err, question),
        None => question,
    };
    tracing::debug!(field = %field, "asking for field");
    HandlerStep::Ask(Clarification {
        fields,
        field,
        question,
        error,
    })
}

/// True when an optional text field holds nothing usable.
pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_prefixes_the_question() {
        let step = ask(
            (),
            Field::Severity,
            "How severe is it?".to_string(),
            Some("Severity must be a whole number between 1 and 10 (got 11).".to_string()),
        );
        match step {
            HandlerStep::Ask(c) => {
                assert!(c.question.starts_with("Severity must be"));
                assert!(c.question.ends_with("How severe is it?"));
                assert_eq!(c.field, Field::Severity);
            }
            other => panic!("expected a clarification, got {:?}", other),
        }
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let outcome = HandlerOutcome::Clarification {
            field: Field::Dosage,
            question: "What dose?".to_string(),
            error: None,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "clarification");
        assert_eq!(value["field"], "dosage");
        assert!(value.get("error").is_none());
        assert_eq!(outcome.text(), "What dose?");
        assert!(outcome.tool_result().is_none());
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some("  ")));
        assert!(!is_blank(Some("aspirin")));
    }
}
