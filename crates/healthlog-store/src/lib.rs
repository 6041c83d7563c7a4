// ABOUTME: Persistence layer for healthlog, keeping the journal durable across restarts.
// ABOUTME: Provides the JSONL journal sink and crash recovery into a HealthStore.

pub mod jsonl;
pub mod recovery;

pub use jsonl::{JournalLog, JsonlError};
pub use recovery::{JOURNAL_FILE, RecoveryError, recover_store};
