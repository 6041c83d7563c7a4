// ABOUTME: Summary specialist: composes the doctor-visit report through get_health_summary.

use async_trait::async_trait;
use healthlog_core::{HealthSummaryTool, StorageUnavailable, Tool};
use serde_json::json;

use super::{HandlerStep, SpecialistHandler};
use crate::intent::{HandlerKind, SummaryFields};

pub struct SummaryHandler {
    tool: HealthSummaryTool,
    recent_medications: usize,
}

impl SummaryHandler {
    pub fn new(tool: HealthSummaryTool, recent_medications: usize) -> Self {
        Self {
            tool,
            recent_medications,
        }
    }
}

#[async_trait]
impl SpecialistHandler for SummaryHandler {
    type Fields = SummaryFields;

    fn kind(&self) -> HandlerKind {
        HandlerKind::Summary
    }

    async fn handle(
        &self,
        fields: SummaryFields,
    ) -> Result<HandlerStep<SummaryFields>, StorageUnavailable> {
        let recent = fields.recent_medications.unwrap_or(self.recent_medications);
        let result = self
            .tool
            .execute(json!({ "recent_medications": recent }))
            .await?;
        Ok(HandlerStep::Done(result))
    }
}
