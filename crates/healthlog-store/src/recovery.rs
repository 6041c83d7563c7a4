// ABOUTME: Crash recovery for the health journal: repair the JSONL file, replay it, and rebuild the store.
// ABOUTME: The recovered store keeps writing to the same journal through its EntrySink.

use std::path::Path;

use healthlog_core::HealthStore;
use thiserror::Error;

use crate::jsonl::{JournalLog, JsonlError};

/// File name of the journal inside a data directory.
pub const JOURNAL_FILE: &str = "journal.jsonl";

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("jsonl error: {0}")]
    Jsonl(#[from] JsonlError),
}

/// Recover a durable store from the journal at `path`.
///
/// Recovery sequence:
/// 1. Repair the journal if it exists (drop partial or unreadable lines)
/// 2. Replay the remaining entries in order
/// 3. Rebuild the in-memory store from them
/// 4. Reopen the journal for appending and attach it as the store's sink
pub fn recover_store(path: &Path) -> Result<HealthStore, RecoveryError> {
    let entries = if path.exists() {
        let retained = JournalLog::repair(path)?;
        tracing::info!(path = %path.display(), retained, "repaired journal");
        JournalLog::replay(path)?
    } else {
        tracing::info!(path = %path.display(), "no journal found, starting empty");
        Vec::new()
    };

    let log = JournalLog::open(path)?;
    Ok(HealthStore::from_entries(entries).with_sink(Box::new(log)))
}
