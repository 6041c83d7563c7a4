// ABOUTME: Per-conversation state: the partial requests still waiting for an answer, plus idle-time tracking.
// ABOUTME: SessionMap hands out one lock per conversation so turns of a conversation run one at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use healthlog_core::Field;

use crate::extract;
use crate::intent::{
    HandlerKind, Intent, MedicationFields, PatternFields, SummaryFields, SymptomFields,
};

/// Default idle time after which a conversation's pending questions are dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Input gathered for one handler call.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Symptom(SymptomFields),
    Medication(MedicationFields),
    Pattern(PatternFields),
    Summary(SummaryFields),
}

impl Draft {
    pub fn from_intent(intent: Intent) -> Option<Self> {
        match intent {
            Intent::Symptom(f) => Some(Draft::Symptom(f)),
            Intent::Medication(f) => Some(Draft::Medication(f)),
            Intent::Pattern(f) => Some(Draft::Pattern(f)),
            Intent::Summary(f) => Some(Draft::Summary(f)),
            Intent::Unrecognized => None,
        }
    }

    pub fn kind(&self) -> HandlerKind {
        match self {
            Draft::Symptom(_) => HandlerKind::Symptom,
            Draft::Medication(_) => HandlerKind::Medication,
            Draft::Pattern(_) => HandlerKind::Pattern,
            Draft::Summary(_) => HandlerKind::Summary,
        }
    }

    /// Fold a newer intent into this draft when it is the same item and
    /// only fills gaps. Gives the intent back when it belongs elsewhere.
    pub fn absorb(&mut self, intent: Intent) -> Result<(), Intent> {
        match (self, intent) {
            (Draft::Symptom(current), Intent::Symptom(newer)) if current.completes(&newer) => {
                current.merge(newer);
                Ok(())
            }
            (Draft::Medication(current), Intent::Medication(newer))
                if current.completes(&newer) =>
            {
                current.merge(newer);
                Ok(())
            }
            (Draft::Pattern(_), Intent::Pattern(_)) | (Draft::Summary(_), Intent::Summary(_)) => {
                Ok(())
            }
            (_, intent) => Err(intent),
        }
    }
}

/// A draft parked until the user supplies `awaiting`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub draft: Draft,
    pub awaiting: Field,
}

impl PendingRequest {
    /// Read `text` as the answer to the awaited field. Returns `None` when
    /// the reply does not look like an answer at all (small talk, or a
    /// dosage with no amount in it) so the request can stay parked.
    pub fn answer(&self, text: &str) -> Option<Draft> {
        let text = text.trim();
        if text.is_empty() || extract::is_small_talk(text) {
            return None;
        }

        let mut draft = self.draft.clone();
        match (&mut draft, self.awaiting) {
            (Draft::Symptom(f), Field::SymptomName) => f.name = Some(name_answer(text)?),
            (Draft::Symptom(f), Field::Severity) => f.severity = Some(extract::severity_answer(text)),
            (Draft::Symptom(f), Field::Notes) => {
                f.notes = Some(if extract::is_decline(text) {
                    String::new()
                } else {
                    text.to_string()
                });
            }
            (Draft::Medication(f), Field::MedicationName) => f.name = Some(name_answer(text)?),
            (Draft::Medication(f), Field::Dosage) => {
                let normalized = extract::normalize(text);
                f.dosage = match extract::dosage(&normalized) {
                    Some(dosage) => Some(dosage),
                    None if extract::mentions_amount(text) => Some(extract::answer_text(text)),
                    None => return None,
                };
            }
            (Draft::Medication(f), Field::TimeTaken) => {
                let lower = text.to_lowercase();
                f.time_taken = if matches!(lower.as_str(), "now" | "just now" | "right now") {
                    None
                } else {
                    Some(extract::time_of_day(&lower).unwrap_or_else(|| text.to_string()))
                };
            }
            (draft, field) => {
                tracing::warn!(handler = %draft.kind(), field = %field, "answer for a field this draft does not have");
            }
        }
        Some(draft)
    }
}

/// A symptom or medication name. Declines and questions are not names.
fn name_answer(text: &str) -> Option<String> {
    if extract::is_decline(text) || text.ends_with('?') {
        return None;
    }
    Some(extract::answer_text(text))
}

/// State of one conversation between turns.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    /// Oldest first.
    pub pending: Vec<PendingRequest>,
    pub turns: u64,
    last_active: Instant,
}

impl ConversationSession {
    pub fn new(now: Instant) -> Self {
        Self {
            pending: Vec::new(),
            turns: 0,
            last_active: now,
        }
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_active) >= ttl
    }

    /// Drop pending questions that have sat idle for longer than `ttl`.
    pub fn expire_if_idle(&mut self, now: Instant, ttl: Duration) -> bool {
        if self.pending.is_empty() || !self.is_expired(now, ttl) {
            return false;
        }
        tracing::info!(dropped = self.pending.len(), "session idle too long, dropping pending requests");
        self.pending.clear();
        true
    }

    /// Record a finished turn.
    pub fn commit(&mut self, pending: Vec<PendingRequest>, now: Instant) {
        self.pending = pending;
        self.turns += 1;
        self.last_active = now;
    }
}

/// Conversation id to session. Each session sits behind its own async
/// mutex; the map itself is only locked to look a session up.
pub struct SessionMap {
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<ConversationSession>>>>,
    ttl: Duration,
}

impl SessionMap {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The session for `conversation_id`, created on first use.
    pub fn acquire(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<ConversationSession>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            sessions
                .entry(conversation_id.to_string())
                .or_insert_with(|| {
                    tracing::debug!(conversation_id, "new conversation session");
                    Arc::new(tokio::sync::Mutex::new(ConversationSession::new(Instant::now())))
                }),
        )
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle for at least the TTL as of `now`. Sessions in
    /// the middle of a turn are kept. Returns how many were removed.
    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(s) => !s.is_expired(now, self.ttl),
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}
