// ABOUTME: The uniform success/error envelope returned by every domain tool.
// ABOUTME: Carries a human-readable message and an optional structured payload; validation failures name their field.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::validation::{Field, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Outcome of a tool call. A tool reports anticipated failures here rather
/// than as a Rust error, so callers can treat every tool identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    pub fn success(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
            data: None,
        }
    }

    /// An error envelope for a rejected field. The field name travels in
    /// `data.field` so the caller can ask for that field again.
    pub fn invalid(err: &ValidationError) -> Self {
        Self {
            status: ToolStatus::Error,
            message: err.message.clone(),
            data: Some(json!({ "field": err.field.key() })),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }

    /// The field an error result blames, if any.
    pub fn error_field(&self) -> Option<Field> {
        if !self.is_error() {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| d.get("field"))
            .and_then(|f| f.as_str())
            .and_then(Field::from_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_result_names_the_field() {
        let err = ValidationError::new(Field::Severity, "Severity must be between 1 and 10");
        let result = ToolResult::invalid(&err);
        assert!(result.is_error());
        assert_eq!(result.error_field(), Some(Field::Severity));
        assert_eq!(result.message, "Severity must be between 1 and 10");
    }

    #[test]
    fn plain_error_has_no_field() {
        let result = ToolResult::error("something odd happened");
        assert!(result.is_error());
        assert_eq!(result.error_field(), None);
    }

    #[test]
    fn success_never_reports_a_field() {
        let result = ToolResult::success("ok", Some(json!({ "field": "severity" })));
        assert!(result.is_success());
        assert_eq!(result.error_field(), None);
    }

    #[test]
    fn status_serializes_lowercase_and_omits_empty_data() {
        let json = serde_json::to_value(ToolResult::error("nope")).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("data").is_none());
    }
}
