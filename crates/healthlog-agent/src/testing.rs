// ABOUTME: Test utilities for healthlog-agent, including a stub intent classifier.
// ABOUTME: Lets tests drive the coordinator with exact intents instead of real text classification.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::classifier::{ClassifierError, IntentClassifier};
use crate::intent::Intent;

/// A classifier that ignores the text and returns pre-configured intents.
///
/// Queued replies are handed out one per call; once the queue is empty
/// every call returns the fallback list given to `new`.
#[derive(Debug)]
pub struct StubClassifier {
    fallback: Vec<Intent>,
    queue: Mutex<VecDeque<Vec<Intent>>>,
}

impl StubClassifier {
    /// A stub that always returns `intents`.
    pub fn new(intents: Vec<Intent>) -> Self {
        Self {
            fallback: intents,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// A stub that returns each list in `replies` once, in order, and
    /// `[Intent::Unrecognized]` afterwards.
    pub fn sequence(replies: Vec<Vec<Intent>>) -> Self {
        Self {
            fallback: vec![Intent::Unrecognized],
            queue: Mutex::new(replies.into()),
        }
    }

    /// A stub that recognizes nothing.
    pub fn unrecognized() -> Self {
        Self::new(vec![Intent::Unrecognized])
    }
}

#[async_trait]
impl IntentClassifier for StubClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<Intent>, ClassifierError> {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
