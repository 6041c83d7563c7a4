// ABOUTME: Agent layer for healthlog: intent classification, the four specialist handlers, and the coordinator.
// ABOUTME: Keeps per-conversation clarification state and routes each utterance to one or more handlers.

pub mod classifier;
pub mod client;
pub mod coordinator;
pub mod extract;
pub mod handlers;
pub mod intent;
pub mod keyword;
pub mod providers;
pub mod session;
pub mod testing;

pub use classifier::{ClassifierError, IntentClassifier};
pub use client::create_classifier;
pub use coordinator::{Coordinator, CoordinatorError, FALLBACK_MESSAGE, HandlerResponse, Reply};
pub use handlers::{HandlerConfig, HandlerOutcome};
pub use intent::{HandlerKind, Intent};
pub use keyword::KeywordClassifier;
pub use providers::{ClassifierOptions, RetryPolicy};
pub use session::DEFAULT_SESSION_TTL;
pub use testing::StubClassifier;
