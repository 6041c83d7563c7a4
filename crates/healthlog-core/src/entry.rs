// ABOUTME: Defines the immutable journal records: symptom entries, medication entries, and their tagged union.
// ABOUTME: Entries are created only by the store after validation and are never updated or deleted.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::validation::Severity;

/// A single symptom observation reported by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub entry_id: Ulid,
    pub symptom_name: String,
    pub severity: Severity,
    #[serde(default)]
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

/// A single medication intake reported by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub entry_id: Ulid,
    pub medication_name: String,
    pub dosage: String,
    /// When the medication was taken, in the offset it was reported in.
    pub time_taken: DateTime<FixedOffset>,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Discriminates the two append-only logs held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Symptom,
    Medication,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Symptom => "symptom",
            EntryKind::Medication => "medication",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symptom" | "symptoms" => Ok(EntryKind::Symptom),
            "medication" | "medications" => Ok(EntryKind::Medication),
            other => Err(format!("unknown entry kind: {}", other)),
        }
    }
}

/// Either kind of journal record. This is the unit read back by
/// `HealthStore::read` and the unit written to a durable journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEntry {
    Symptom(SymptomEntry),
    Medication(MedicationEntry),
}

impl JournalEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            JournalEntry::Symptom(_) => EntryKind::Symptom,
            JournalEntry::Medication(_) => EntryKind::Medication,
        }
    }

    pub fn entry_id(&self) -> Ulid {
        match self {
            JournalEntry::Symptom(e) => e.entry_id,
            JournalEntry::Medication(e) => e.entry_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JournalEntry::Symptom(e) => e.timestamp,
            JournalEntry::Medication(e) => e.timestamp,
        }
    }
}
