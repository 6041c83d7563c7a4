// ABOUTME: Pattern specialist: runs analyze_patterns immediately, optionally over the last N symptom entries.

use async_trait::async_trait;
use healthlog_core::{AnalyzePatternsTool, StorageUnavailable, Tool};
use serde_json::json;

use super::{HandlerStep, SpecialistHandler};
use crate::intent::{HandlerKind, PatternFields};

pub struct PatternHandler {
    tool: AnalyzePatternsTool,
}

impl PatternHandler {
    pub fn new(tool: AnalyzePatternsTool) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl SpecialistHandler for PatternHandler {
    type Fields = PatternFields;

    fn kind(&self) -> HandlerKind {
        HandlerKind::Pattern
    }

    async fn handle(
        &self,
        fields: PatternFields,
    ) -> Result<HandlerStep<PatternFields>, StorageUnavailable> {
        let params = match fields.window {
            Some(window) => json!({ "window": window }),
            None => json!({}),
        };
        Ok(HandlerStep::Done(self.tool.execute(params).await?))
    }
}
