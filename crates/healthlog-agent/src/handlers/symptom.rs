// ABOUTME: Symptom specialist: collects a symptom name and a 1-10 severity, then calls log_symptom.
// ABOUTME: Asks for the name first, then the severity, and optionally once for notes.

use async_trait::async_trait;
use healthlog_core::{Field, LogSymptomTool, StorageUnavailable, Tool};
use serde_json::{Value, json};

use super::{HandlerStep, SpecialistHandler, ask, is_blank};
use crate::intent::{HandlerKind, SymptomFields};

pub struct SymptomHandler {
    tool: LogSymptomTool,
    ask_for_notes: bool,
}

impl SymptomHandler {
    pub fn new(tool: LogSymptomTool, ask_for_notes: bool) -> Self {
        Self {
            tool,
            ask_for_notes,
        }
    }

    fn question(field: Field, fields: &SymptomFields) -> String {
        let name = fields.name.as_deref().unwrap_or("symptom");
        match field {
            Field::SymptomName => "What symptom are you experiencing?".to_string(),
            Field::Severity => format!(
                "On a scale of 1 to 10, how severe is your {}? (1 is barely noticeable, 10 is the worst imaginable)",
                name
            ),
            Field::Notes => format!(
                "Anything you'd like to note about your {}? (say 'no' to skip)",
                name
            ),
            other => format!("Could you tell me the {}?", other.describe()),
        }
    }

    fn clear(fields: &mut SymptomFields, field: Field) {
        match field {
            Field::SymptomName => fields.name = None,
            Field::Severity => fields.severity = None,
            Field::Notes => fields.notes = None,
            _ => {}
        }
    }
}

#[async_trait]
impl SpecialistHandler for SymptomHandler {
    type Fields = SymptomFields;

    fn kind(&self) -> HandlerKind {
        HandlerKind::Symptom
    }

    async fn handle(
        &self,
        mut fields: SymptomFields,
    ) -> Result<HandlerStep<SymptomFields>, StorageUnavailable> {
        if is_blank(fields.name.as_deref()) {
            let question = Self::question(Field::SymptomName, &fields);
            return Ok(ask(fields, Field::SymptomName, question, None));
        }
        if fields.severity.is_none() {
            let question = Self::question(Field::Severity, &fields);
            return Ok(ask(fields, Field::Severity, question, None));
        }
        if self.ask_for_notes && fields.notes.is_none() {
            let question = Self::question(Field::Notes, &fields);
            return Ok(ask(fields, Field::Notes, question, None));
        }

        let params = json!({
            "symptom_name": fields.name,
            "severity": fields.severity.clone().unwrap_or(Value::Null),
            "notes": fields.notes.clone().unwrap_or_default(),
        });
        let result = self.tool.execute(params).await?;

        if let Some(field) = result.error_field() {
            tracing::info!(handler = %self.kind(), field = %field, "tool rejected a field, asking again");
            Self::clear(&mut fields, field);
            let question = Self::question(field, &fields);
            return Ok(ask(fields, field, question, Some(result.message)));
        }

        Ok(HandlerStep::Done(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthlog_core::HealthStore;
    use std::sync::Arc;

    fn handler(ask_for_notes: bool) -> (SymptomHandler, Arc<HealthStore>) {
        let store = Arc::new(HealthStore::new());
        let handler = SymptomHandler::new(LogSymptomTool::new(Arc::clone(&store)), ask_for_notes);
        (handler, store)
    }

    fn fields(name: Option<&str>, severity: Option<Value>) -> SymptomFields {
        SymptomFields {
            name: name.map(String::from),
            severity,
            notes: None,
        }
    }

    #[tokio::test]
    async fn asks_for_name_before_severity() {
        let (handler, store) = handler(false);
        match handler.handle(fields(None, None)).await.unwrap() {
            HandlerStep::Ask(c) => assert_eq!(c.field, Field::SymptomName),
            other => panic!("expected a question, got {:?}", other),
        }
        assert_eq!(store.symptom_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn asks_for_severity_with_the_scale() {
        let (handler, _) = handler(false);
        match handler.handle(fields(Some("headache"), None)).await.unwrap() {
            HandlerStep::Ask(c) => {
                assert_eq!(c.field, Field::Severity);
                assert!(c.question.contains("headache"));
                assert!(c.question.contains("1 to 10"));
                assert_eq!(c.fields.name.as_deref(), Some("headache"));
            }
            other => panic!("expected a question, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn logs_when_complete() {
        let (handler, store) = handler(false);
        let step = handler
            .handle(fields(Some("headache"), Some(json!(7))))
            .await
            .unwrap();
        match step {
            HandlerStep::Done(result) => assert!(result.is_success()),
            other => panic!("expected a tool result, got {:?}", other),
        }
        assert_eq!(store.symptom_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn out_of_range_severity_is_asked_again_with_the_reason() {
        let (handler, store) = handler(false);
        let step = handler
            .handle(fields(Some("headache"), Some(json!(12))))
            .await
            .unwrap();
        match step {
            HandlerStep::Ask(c) => {
                assert_eq!(c.field, Field::Severity);
                assert!(c.fields.severity.is_none());
                assert!(c.error.as_deref().unwrap().contains("between 1 and 10"));
                assert!(c.question.starts_with("Severity must be"));
            }
            other => panic!("expected a question, got {:?}", other),
        }
        assert_eq!(store.symptom_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn notes_are_asked_once_when_enabled() {
        let (handler, store) = handler(true);
        let step = handler
            .handle(fields(Some("nausea"), Some(json!(4))))
            .await
            .unwrap();
        let mut pending = match step {
            HandlerStep::Ask(c) => {
                assert_eq!(c.field, Field::Notes);
                c.fields
            }
            other => panic!("expected a question, got {:?}", other),
        };

        pending.notes = Some(String::new());
        let step = handler.handle(pending).await.unwrap();
        assert!(matches!(step, HandlerStep::Done(ref r) if r.is_success()));
        assert_eq!(store.symptoms(None).unwrap()[0].notes, "");
    }
}
