// ABOUTME: Medication specialist: collects a medication name and dosage, then calls track_medication.
// ABOUTME: The intake time is optional and defaults to now; a rejected time is asked for again.

use async_trait::async_trait;
use healthlog_core::{Field, StorageUnavailable, Tool, TrackMedicationTool};
use serde_json::{Map, Value};

use super::{HandlerStep, SpecialistHandler, ask, is_blank};
use crate::intent::{HandlerKind, MedicationFields};

pub struct MedicationHandler {
    tool: TrackMedicationTool,
}

impl MedicationHandler {
    pub fn new(tool: TrackMedicationTool) -> Self {
        Self { tool }
    }

    fn question(field: Field, fields: &MedicationFields) -> String {
        let name = fields.name.as_deref().unwrap_or("it");
        match field {
            Field::MedicationName => "Which medication did you take?".to_string(),
            Field::Dosage => format!(
                "What dose of {} did you take? (for example 200mg or 2 tablets)",
                name
            ),
            Field::TimeTaken => format!(
                "When did you take {}? (a time like 08:30, or 'now')",
                name
            ),
            other => format!("Could you tell me the {}?", other.describe()),
        }
    }

    fn clear(fields: &mut MedicationFields, field: Field) {
        match field {
            Field::MedicationName => fields.name = None,
            Field::Dosage => fields.dosage = None,
            Field::TimeTaken => fields.time_taken = None,
            _ => {}
        }
    }

    fn params(fields: &MedicationFields) -> Value {
        let mut params = Map::new();
        if let Some(name) = &fields.name {
            params.insert(Field::MedicationName.key().into(), Value::String(name.clone()));
        }
        if let Some(dosage) = &fields.dosage {
            params.insert(Field::Dosage.key().into(), Value::String(dosage.clone()));
        }
        if let Some(time) = &fields.time_taken {
            params.insert(Field::TimeTaken.key().into(), Value::String(time.clone()));
        }
        Value::Object(params)
    }
}

#[async_trait]
impl SpecialistHandler for MedicationHandler {
    type Fields = MedicationFields;

    fn kind(&self) -> HandlerKind {
        HandlerKind::Medication
    }

    async fn handle(
        &self,
        mut fields: MedicationFields,
    ) -> Result<HandlerStep<MedicationFields>, StorageUnavailable> {
        for field in [Field::MedicationName, Field::Dosage] {
            let value = match field {
                Field::MedicationName => fields.name.as_deref(),
                _ => fields.dosage.as_deref(),
            };
            if is_blank(value) {
                let question = Self::question(field, &fields);
                return Ok(ask(fields, field, question, None));
            }
        }

        let result = self.tool.execute(Self::params(&fields)).await?;

        if let Some(field) = result.error_field() {
            tracing::info!(handler = %self.kind(), field = %field, "tool rejected a field, asking again");
            Self::clear(&mut fields, field);
            let question = Self::question(field, &fields);
            return Ok(ask(fields, field, question, Some(result.message)));
        }

        Ok(HandlerStep::Done(result))
    }
}
