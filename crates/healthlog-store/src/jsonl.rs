// ABOUTME: Append-only JSONL journal of symptom and medication entries.
// ABOUTME: Provides fsynced appends, replay with line-numbered errors, repair of torn writes, and the store's EntrySink.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use healthlog_core::{EntrySink, JournalEntry};
use thiserror::Error;

/// Errors that can occur during journal operations.
#[derive(Debug, Error)]
pub enum JsonlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("journal line {line} is unreadable: {source}")]
    Corrupt {
        line: usize,
        source: serde_json::Error,
    },

    #[error("journal file handle poisoned")]
    Poisoned,
}

/// An append-only journal backed by a file.
/// Each line is a single JSON-serialized JournalEntry followed by a newline.
pub struct JournalLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JournalLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (or create) a journal at the given path, creating parent
    /// directories as needed. The file is opened in append mode.
    pub fn open(path: &Path) -> Result<Self, JsonlError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Append one entry as a JSON line and fsync it to disk.
    pub fn append(&self, entry: &JournalEntry) -> Result<(), JsonlError> {
        let json = serde_json::to_string(entry)?;
        let mut file = self.file.lock().map_err(|_| JsonlError::Poisoned)?;
        writeln!(file, "{}", json)?;
        file.sync_all()?;
        Ok(())
    }

    /// Read every entry from a journal file in order. Blank lines are skipped;
    /// the first unreadable line fails the whole replay.
    pub fn replay(path: &Path) -> Result<Vec<JournalEntry>, JsonlError> {
        let bytes = fs::read(path)?;
        let contents = String::from_utf8_lossy(&bytes);
        parsed_lines(&contents)
            .map(|(line, _, parsed)| parsed.map_err(|source| JsonlError::Corrupt { line, source }))
            .collect()
    }

    /// Drop every line that no longer reads back as an entry, usually a
    /// write cut short by a crash. Returns the number of entries kept.
    /// The file is only rewritten when something was dropped.
    pub fn repair(path: &Path) -> Result<usize, JsonlError> {
        let bytes = fs::read(path)?;
        let contents = String::from_utf8_lossy(&bytes);

        let mut kept = String::with_capacity(contents.len());
        let mut retained = 0usize;
        let mut dropped = 0usize;
        for (line, raw, parsed) in parsed_lines(&contents) {
            if let Err(error) = parsed {
                tracing::warn!(path = %path.display(), line, %error, "dropping unreadable journal line");
                dropped += 1;
                continue;
            }
            kept.push_str(raw);
            kept.push('\n');
            retained += 1;
        }

        if dropped > 0 {
            replace_file(path, kept.as_bytes())?;
        }
        Ok(retained)
    }
}

/// Non-blank lines with their 1-based line number and parse result.
fn parsed_lines(
    contents: &str,
) -> impl Iterator<Item = (usize, &str, serde_json::Result<JournalEntry>)> + '_ {
    contents
        .lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(index, raw)| (index + 1, raw, serde_json::from_str(raw)))
}

/// Swap in new file contents through a synced sibling file and a rename,
/// so a crash leaves either the old journal or the new one.
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), JsonlError> {
    let staged = path.with_extension("jsonl.repair");
    let mut file = File::create(&staged)?;
    file.write_all(contents)?;
    file.sync_all()?;
    fs::rename(&staged, path)?;

    // The rename is done; a failed directory sync only delays durability.
    if let Some(dir) = path.parent().and_then(|parent| File::open(parent).ok()) {
        let _ = dir.sync_all();
    }
    Ok(())
}

impl EntrySink for JournalLog {
    fn persist(&self, entry: &JournalEntry) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.append(entry).map_err(Into::into)
    }
}
