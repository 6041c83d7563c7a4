// ABOUTME: The coordinator: classifies each utterance, splits it into drafts, and dispatches them to specialists.
// ABOUTME: Resumes pending clarifications per conversation and combines every handler's outcome into one reply.

use std::sync::Arc;
use std::time::{Duration, Instant};

use healthlog_core::{HealthStore, StorageUnavailable, ToolSet};
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierError, IntentClassifier};
use crate::handlers::{
    HandlerConfig, HandlerOutcome, HandlerStep, MedicationHandler, PatternHandler,
    SpecialistHandler, SummaryHandler, SymptomHandler,
};
use crate::intent::{HandlerKind, Intent};
use crate::session::{DEFAULT_SESSION_TTL, Draft, PendingRequest, SessionMap};

/// Reply for an utterance no handler can take.
pub const FALLBACK_MESSAGE: &str = "I can log a symptom with its severity (1-10), track a medication you took, \
     show patterns in your symptoms, or put together a summary for your doctor. \
     Could you tell me which of those you need?";

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Storage(#[from] StorageUnavailable),

    #[error("intent classification failed: {0}")]
    Classifier(#[from] ClassifierError),
}

/// One handler's contribution to a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResponse {
    pub handler: HandlerKind,
    #[serde(flatten)]
    pub outcome: HandlerOutcome,
}

/// Everything said back for one utterance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reply {
    pub responses: Vec<HandlerResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Reply {
    fn fallback() -> Self {
        Self {
            responses: Vec::new(),
            fallback: Some(FALLBACK_MESSAGE.to_string()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// One text block, each part prefixed with its topic.
    pub fn render(&self) -> String {
        if let Some(fallback) = &self.fallback {
            return fallback.clone();
        }
        self.responses
            .iter()
            .map(|r| format!("[{}] {}", r.handler.topic(), r.outcome.text()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Routes utterances to the four specialists over one store.
pub struct Coordinator {
    store: Arc<HealthStore>,
    classifier: Arc<dyn IntentClassifier>,
    symptom: SymptomHandler,
    medication: MedicationHandler,
    pattern: PatternHandler,
    summary: SummaryHandler,
    sessions: SessionMap,
}

impl Coordinator {
    pub fn new(store: Arc<HealthStore>, classifier: Arc<dyn IntentClassifier>) -> Self {
        Self::with_config(store, classifier, HandlerConfig::default(), DEFAULT_SESSION_TTL)
    }

    pub fn with_config(
        store: Arc<HealthStore>,
        classifier: Arc<dyn IntentClassifier>,
        config: HandlerConfig,
        session_ttl: Duration,
    ) -> Self {
        let tools = ToolSet::new(Arc::clone(&store));
        tracing::info!(
            classifier = classifier.name(),
            ask_for_notes = config.ask_for_notes,
            "coordinator ready"
        );
        Self {
            store,
            classifier,
            symptom: SymptomHandler::new(tools.log_symptom, config.ask_for_notes),
            medication: MedicationHandler::new(tools.track_medication),
            pattern: PatternHandler::new(tools.analyze_patterns),
            summary: SummaryHandler::new(tools.health_summary, config.recent_medications),
            sessions: SessionMap::new(session_ttl),
        }
    }

    /// Read-only access to the journal.
    pub fn store(&self) -> &Arc<HealthStore> {
        &self.store
    }

    /// Drop conversations idle for longer than the session TTL.
    pub fn evict_idle_sessions(&self) -> usize {
        self.sessions.evict_expired_at(Instant::now())
    }

    /// Handle one user utterance in one conversation.
    pub async fn handle_utterance(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<Reply, CoordinatorError> {
        let slot = self.sessions.acquire(conversation_id);
        let mut session = slot.lock().await;
        session.expire_if_idle(Instant::now(), self.sessions.ttl());

        let intents = self.classifier.classify(text).await?;
        tracing::info!(
            conversation_id,
            intents = intents.len(),
            pending = session.pending.len(),
            turn = session.turns + 1,
            "utterance classified"
        );

        let mut pending = session.pending.clone();
        let mut drafts: Vec<Draft> = Vec::new();

        for intent in intents.into_iter().filter(Intent::is_recognized) {
            let intent = match absorb_into(&mut drafts, intent) {
                Ok(()) => continue,
                Err(intent) => intent,
            };
            let intent = match take_pending(&mut pending, intent) {
                Ok(draft) => {
                    drafts.push(draft);
                    continue;
                }
                Err(intent) => intent,
            };
            if let Some(draft) = Draft::from_intent(intent) {
                drafts.push(draft);
            }
        }

        if drafts.is_empty() {
            if pending.is_empty() {
                tracing::info!(conversation_id, "unrecognized intent, sending fallback");
                session.commit(pending, Instant::now());
                return Ok(Reply::fallback());
            }
            let Some(answered) = pending[0].answer(text) else {
                tracing::info!(
                    conversation_id,
                    field = %pending[0].awaiting,
                    "utterance is not an answer, sending fallback"
                );
                session.commit(pending, Instant::now());
                return Ok(Reply::fallback());
            };
            let oldest = pending.remove(0);
            tracing::debug!(conversation_id, field = %oldest.awaiting, "treating utterance as an answer");
            drafts.push(answered);
        }

        let mut responses = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let (response, parked) = self.dispatch(conversation_id, draft).await?;
            responses.push(response);
            pending.extend(parked);
        }

        session.commit(pending, Instant::now());
        Ok(Reply {
            responses,
            fallback: None,
        })
    }

    async fn dispatch(
        &self,
        conversation_id: &str,
        draft: Draft,
    ) -> Result<(HandlerResponse, Option<PendingRequest>), StorageUnavailable> {
        match draft {
            Draft::Symptom(f) => run(conversation_id, &self.symptom, f, Draft::Symptom).await,
            Draft::Medication(f) => {
                run(conversation_id, &self.medication, f, Draft::Medication).await
            }
            Draft::Pattern(f) => run(conversation_id, &self.pattern, f, Draft::Pattern).await,
            Draft::Summary(f) => run(conversation_id, &self.summary, f, Draft::Summary).await,
        }
    }
}

/// Merge an intent into a draft already started this turn.
fn absorb_into(drafts: &mut [Draft], mut intent: Intent) -> Result<(), Intent> {
    for draft in drafts.iter_mut() {
        match draft.absorb(intent) {
            Ok(()) => return Ok(()),
            Err(back) => intent = back,
        }
    }
    Err(intent)
}

/// Resume the oldest pending request the intent can complete.
fn take_pending(pending: &mut Vec<PendingRequest>, mut intent: Intent) -> Result<Draft, Intent> {
    for i in 0..pending.len() {
        match pending[i].draft.absorb(intent) {
            Ok(()) => return Ok(pending.remove(i).draft),
            Err(back) => intent = back,
        }
    }
    Err(intent)
}

async fn run<H: SpecialistHandler>(
    conversation_id: &str,
    handler: &H,
    fields: H::Fields,
    wrap: fn(H::Fields) -> Draft,
) -> Result<(HandlerResponse, Option<PendingRequest>), StorageUnavailable> {
    let kind = handler.kind();
    let step = handler.handle(fields).await?;
    let outcome = HandlerOutcome::from(&step);

    let parked = match step {
        HandlerStep::Done(result) => {
            tracing::info!(
                conversation_id,
                handler = %kind,
                status = ?result.status,
                "handler completed"
            );
            None
        }
        HandlerStep::Ask(c) => {
            tracing::info!(
                conversation_id,
                handler = %kind,
                field = %c.field,
                "handler needs clarification"
            );
            Some(PendingRequest {
                draft: wrap(c.fields),
                awaiting: c.field,
            })
        }
    };

    Ok((
        HandlerResponse {
            handler: kind,
            outcome,
        },
        parked,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{MedicationFields, SymptomFields};
    use crate::keyword::KeywordClassifier;
    use crate::testing::StubClassifier;
    use healthlog_core::{EntrySink, Field, JournalEntry, ToolStatus};
    use serde_json::json;

    fn coordinator() -> Coordinator {
        Coordinator::new(Arc::new(HealthStore::new()), Arc::new(KeywordClassifier::new()))
    }

    fn store_size(c: &Coordinator) -> (usize, usize) {
        (
            c.store().symptom_count().unwrap(),
            c.store().medication_count().unwrap(),
        )
    }

    #[tokio::test]
    async fn symptom_and_medication_in_one_sentence_get_two_responses() {
        let c = coordinator();
        let reply = c
            .handle_utterance("conv", "I have a headache and took aspirin")
            .await
            .unwrap();

        assert_eq!(reply.responses.len(), 2);
        assert_eq!(reply.responses[0].handler, HandlerKind::Symptom);
        assert_eq!(reply.responses[1].handler, HandlerKind::Medication);
        assert!(matches!(
            reply.responses[0].outcome,
            HandlerOutcome::Clarification { field: Field::Severity, .. }
        ));
        assert!(matches!(
            reply.responses[1].outcome,
            HandlerOutcome::Clarification { field: Field::Dosage, .. }
        ));

        let text = reply.render();
        assert!(text.contains("[Symptom]"));
        assert!(text.contains("[Medication]"));
        assert_eq!(store_size(&c), (0, 0));
    }

    #[tokio::test]
    async fn complete_multi_intent_sentence_logs_both() {
        let c = coordinator();
        let reply = c
            .handle_utterance("conv", "I have a headache, 7/10, and took aspirin 500mg")
            .await
            .unwrap();

        let statuses: Vec<ToolStatus> = reply
            .responses
            .iter()
            .filter_map(|r| r.outcome.tool_result().map(|t| t.status))
            .collect();
        assert_eq!(statuses, vec![ToolStatus::Success, ToolStatus::Success]);
        assert_eq!(store_size(&c), (1, 1));
    }

    #[tokio::test]
    async fn small_talk_gets_fallback_and_no_writes() {
        let c = coordinator();
        let reply = c.handle_utterance("conv", "lovely weather today").await.unwrap();
        assert!(reply.is_fallback());
        assert!(reply.responses.is_empty());
        assert_eq!(reply.render(), FALLBACK_MESSAGE);
        assert_eq!(store_size(&c), (0, 0));
    }

    #[tokio::test]
    async fn clarification_is_resumed_on_the_next_turn() {
        let c = coordinator();
        let first = c.handle_utterance("conv", "I have a migraine").await.unwrap();
        assert!(first.render().contains("how severe is your migraine"));

        let second = c.handle_utterance("conv", "8").await.unwrap();
        assert_eq!(second.responses.len(), 1);
        let result = second.responses[0].outcome.tool_result().unwrap();
        assert!(result.is_success());

        let logged = c.store().symptoms(None).unwrap();
        assert_eq!(logged[0].symptom_name, "migraine");
        assert_eq!(logged[0].severity.value(), 8);
    }

    #[tokio::test]
    async fn invalid_answer_is_asked_again_with_the_reason() {
        let c = coordinator();
        c.handle_utterance("conv", "I feel dizzy").await.unwrap();

        let reply = c.handle_utterance("conv", "15").await.unwrap();
        match &reply.responses[0].outcome {
            HandlerOutcome::Clarification { field, error, .. } => {
                assert_eq!(*field, Field::Severity);
                assert!(error.as_deref().unwrap().contains("between 1 and 10"));
            }
            other => panic!("expected a clarification, got {:?}", other),
        }
        assert_eq!(store_size(&c), (0, 0));

        let reply = c.handle_utterance("conv", "6").await.unwrap();
        assert!(reply.responses[0].outcome.tool_result().unwrap().is_success());
        assert_eq!(store_size(&c), (1, 0));
    }

    #[tokio::test]
    async fn pleasantry_after_a_question_is_not_logged_as_the_answer() {
        let c = coordinator();
        c.handle_utterance("conv", "took aspirin").await.unwrap();

        let reply = c.handle_utterance("conv", "thanks!").await.unwrap();
        assert!(reply.is_fallback());
        assert_eq!(c.store().medication_count().unwrap(), 0);

        {
            let slot = c.sessions.acquire("conv");
            let session = slot.lock().await;
            assert_eq!(session.pending.len(), 1);
            assert_eq!(session.pending[0].awaiting, Field::Dosage);
        }

        let reply = c.handle_utterance("conv", "500mg").await.unwrap();
        assert!(reply.responses[0].outcome.tool_result().unwrap().is_success());
        let meds = c.store().medications(None).unwrap();
        assert_eq!(meds[0].medication_name, "aspirin");
        assert_eq!(meds[0].dosage, "500mg");
    }

    #[tokio::test]
    async fn same_symptom_reported_twice_in_one_message_logs_twice() {
        let c = coordinator();
        let reply = c
            .handle_utterance(
                "conv",
                "I had a headache this morning, 4/10, and a headache tonight, 8/10",
            )
            .await
            .unwrap();

        assert_eq!(reply.responses.len(), 2);
        let severities: Vec<u8> = c
            .store()
            .symptoms(None)
            .unwrap()
            .iter()
            .map(|s| s.severity.value())
            .collect();
        assert_eq!(severities, vec![4, 8]);
    }

    #[tokio::test]
    async fn answers_go_to_the_oldest_pending_request_first() {
        let c = coordinator();
        c.handle_utterance("conv", "I have a headache and took aspirin")
            .await
            .unwrap();

        let reply = c.handle_utterance("conv", "5").await.unwrap();
        assert_eq!(reply.responses[0].handler, HandlerKind::Symptom);
        assert_eq!(store_size(&c), (1, 0));

        let reply = c.handle_utterance("conv", "325mg").await.unwrap();
        assert_eq!(reply.responses[0].handler, HandlerKind::Medication);
        assert_eq!(store_size(&c), (1, 1));
        assert_eq!(c.store().medications(None).unwrap()[0].dosage, "325mg");
    }

    #[tokio::test]
    async fn a_named_follow_up_completes_the_matching_draft() {
        let c = coordinator();
        c.handle_utterance("conv", "took ibuprofen").await.unwrap();
        let reply = c
            .handle_utterance("conv", "the ibuprofen was 400mg")
            .await
            .unwrap();
        assert_eq!(reply.responses.len(), 1);
        assert!(reply.responses[0].outcome.tool_result().unwrap().is_success());
        assert_eq!(c.store().medications(None).unwrap()[0].dosage, "400mg");
    }

    #[tokio::test]
    async fn conversations_do_not_share_pending_state() {
        let c = coordinator();
        c.handle_utterance("alice", "I have a headache").await.unwrap();
        let reply = c.handle_utterance("bob", "7").await.unwrap();
        assert!(reply.is_fallback());
        assert_eq!(store_size(&c), (0, 0));
    }

    #[tokio::test]
    async fn patterns_and_summary_route_without_questions() {
        let c = coordinator();
        c.handle_utterance("conv", "headache 8/10").await.unwrap();
        c.handle_utterance("conv", "headache 6/10").await.unwrap();
        c.handle_utterance("conv", "nausea, severity 5").await.unwrap();

        let reply = c.handle_utterance("conv", "any patterns?").await.unwrap();
        assert_eq!(reply.responses[0].handler, HandlerKind::Pattern);
        let result = reply.responses[0].outcome.tool_result().unwrap();
        assert_eq!(result.data.as_ref().unwrap()["patterns"][0]["name"], "headache");

        let reply = c
            .handle_utterance("conv", "I need a summary for my doctor")
            .await
            .unwrap();
        assert_eq!(reply.responses[0].handler, HandlerKind::Summary);
        assert!(reply.render().contains("Symptoms logged: 3"));
    }

    #[tokio::test]
    async fn stub_classifier_drives_routing() {
        let stub = StubClassifier::new(vec![
            Intent::Medication(MedicationFields {
                name: Some("naproxen".into()),
                dosage: Some("250mg".into()),
                time_taken: Some("07:45".into()),
            }),
            Intent::Symptom(SymptomFields {
                name: Some("back pain".into()),
                severity: Some(json!(4)),
                notes: Some("after lifting".into()),
            }),
        ]);
        let c = Coordinator::new(Arc::new(HealthStore::new()), Arc::new(stub));
        let reply = c.handle_utterance("conv", "anything").await.unwrap();

        assert_eq!(reply.responses[0].handler, HandlerKind::Medication);
        assert_eq!(reply.responses[1].handler, HandlerKind::Symptom);
        assert_eq!(store_size(&c), (1, 1));
        assert_eq!(c.store().symptoms(None).unwrap()[0].notes, "after lifting");
    }

    struct BrokenSink;

    impl EntrySink for BrokenSink {
        fn persist(&self, _entry: &JournalEntry) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("disk unplugged".into())
        }
    }

    #[tokio::test]
    async fn storage_failure_aborts_the_turn_and_keeps_pending_state() {
        let store = Arc::new(HealthStore::new().with_sink(Box::new(BrokenSink)));
        let c = Coordinator::new(store, Arc::new(KeywordClassifier::new()));

        c.handle_utterance("conv", "I have a headache").await.unwrap();
        let err = c.handle_utterance("conv", "7").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Storage(_)));
        assert_eq!(store_size(&c), (0, 0));

        let slot = c.sessions.acquire("conv");
        let session = slot.lock().await;
        assert_eq!(session.pending.len(), 1);
        assert_eq!(session.pending[0].awaiting, Field::Severity);
    }

    #[tokio::test]
    async fn notes_question_when_enabled() {
        let config = HandlerConfig {
            ask_for_notes: true,
            ..HandlerConfig::default()
        };
        let c = Coordinator::with_config(
            Arc::new(HealthStore::new()),
            Arc::new(KeywordClassifier::new()),
            config,
            DEFAULT_SESSION_TTL,
        );

        let reply = c.handle_utterance("conv", "cough, 3/10").await.unwrap();
        assert!(matches!(
            reply.responses[0].outcome,
            HandlerOutcome::Clarification { field: Field::Notes, .. }
        ));
        c.handle_utterance("conv", "worse at night").await.unwrap();
        assert_eq!(c.store().symptoms(None).unwrap()[0].notes, "worse at night");
    }

    #[tokio::test]
    async fn reply_serializes_with_flattened_outcome() {
        let c = coordinator();
        let reply = c.handle_utterance("conv", "took aspirin").await.unwrap();
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["responses"][0]["handler"], "medication");
        assert_eq!(value["responses"][0]["outcome"], "clarification");
        assert_eq!(value["responses"][0]["field"], "dosage");
    }
}
