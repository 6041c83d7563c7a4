// ABOUTME: HealthStore, the explicitly owned append-only store for symptom and medication logs.
// ABOUTME: Validates and timestamps each entry, optionally persists it through an EntrySink, then makes it visible.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Local, Utc};
use thiserror::Error;
use ulid::Ulid;

use crate::entry::{EntryKind, JournalEntry, MedicationEntry, SymptomEntry};
use crate::validation::{Field, Severity, ValidationError, parse_time_taken, require_text};

/// The store cannot serve requests. Fatal for the current turn.
#[derive(Debug, Clone, Error)]
#[error("storage unavailable: {0}")]
pub struct StorageUnavailable(pub String);

/// Errors an append can produce.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Unavailable(#[from] StorageUnavailable),
}

/// Durable destination for appended entries. `persist` runs under the
/// store's write lock before the entry becomes visible, so the sink sees
/// entries in exactly the order readers do.
pub trait EntrySink: Send + Sync {
    fn persist(&self, entry: &JournalEntry) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Default)]
struct Logs {
    symptoms: Vec<SymptomEntry>,
    medications: Vec<MedicationEntry>,
}

/// Two ordered, append-only logs. There is deliberately no update or
/// delete API.
#[derive(Default)]
pub struct HealthStore {
    logs: RwLock<Logs>,
    sink: Option<Box<dyn EntrySink>>,
}

impl std::fmt::Debug for HealthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthStore")
            .field("logs", &self.logs)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl HealthStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        tracing::info!("health store initialized");
        Self::default()
    }

    /// Rebuild a store from previously recorded entries, preserving order.
    pub fn from_entries(entries: impl IntoIterator<Item = JournalEntry>) -> Self {
        let mut logs = Logs::default();
        for entry in entries {
            match entry {
                JournalEntry::Symptom(s) => logs.symptoms.push(s),
                JournalEntry::Medication(m) => logs.medications.push(m),
            }
        }
        tracing::info!(
            symptoms = logs.symptoms.len(),
            medications = logs.medications.len(),
            "health store rebuilt from entries"
        );
        Self {
            logs: RwLock::new(logs),
            sink: None,
        }
    }

    /// Attach a sink that every subsequent append is persisted through.
    pub fn with_sink(mut self, sink: Box<dyn EntrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate and append a symptom entry.
    pub fn append_symptom(
        &self,
        name: &str,
        severity: Severity,
        notes: &str,
    ) -> Result<SymptomEntry, StoreError> {
        let symptom_name = require_text(Field::SymptomName, name)?;

        let entry = SymptomEntry {
            entry_id: Ulid::new(),
            symptom_name,
            severity,
            notes: notes.trim().to_string(),
            timestamp: Utc::now(),
        };

        let mut logs = self.write()?;
        self.persist(&JournalEntry::Symptom(entry.clone()))?;
        logs.symptoms.push(entry.clone());

        tracing::info!(
            entry_id = %entry.entry_id,
            symptom = %entry.symptom_name,
            severity = %entry.severity,
            "symptom added"
        );
        Ok(entry)
    }

    /// Validate and append a medication entry. `when` defaults to the
    /// current local time.
    pub fn append_medication(
        &self,
        name: &str,
        dosage: &str,
        when: Option<&str>,
    ) -> Result<MedicationEntry, StoreError> {
        let medication_name = require_text(Field::MedicationName, name)?;
        let dosage = require_text(Field::Dosage, dosage)?;
        let time_taken = parse_time_taken(when, &Local::now())?;

        let entry = MedicationEntry {
            entry_id: Ulid::new(),
            medication_name,
            dosage,
            time_taken,
            timestamp: Utc::now(),
        };

        let mut logs = self.write()?;
        self.persist(&JournalEntry::Medication(entry.clone()))?;
        logs.medications.push(entry.clone());

        tracing::info!(
            entry_id = %entry.entry_id,
            medication = %entry.medication_name,
            dosage = %entry.dosage,
            "medication tracked"
        );
        Ok(entry)
    }

    /// Read entries of one kind in insertion order. `limit` keeps only the
    /// most recent `limit` entries.
    pub fn read(
        &self,
        kind: EntryKind,
        limit: Option<usize>,
    ) -> Result<Vec<JournalEntry>, StorageUnavailable> {
        let entries = match kind {
            EntryKind::Symptom => self
                .symptoms(limit)?
                .into_iter()
                .map(JournalEntry::Symptom)
                .collect(),
            EntryKind::Medication => self
                .medications(limit)?
                .into_iter()
                .map(JournalEntry::Medication)
                .collect(),
        };
        Ok(entries)
    }

    pub fn symptoms(&self, limit: Option<usize>) -> Result<Vec<SymptomEntry>, StorageUnavailable> {
        let logs = self.read_logs()?;
        let results = tail(&logs.symptoms, limit);
        tracing::debug!(count = results.len(), "retrieved symptoms");
        Ok(results)
    }

    pub fn medications(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<MedicationEntry>, StorageUnavailable> {
        let logs = self.read_logs()?;
        let results = tail(&logs.medications, limit);
        tracing::debug!(count = results.len(), "retrieved medications");
        Ok(results)
    }

    pub fn symptom_count(&self) -> Result<usize, StorageUnavailable> {
        Ok(self.read_logs()?.symptoms.len())
    }

    pub fn medication_count(&self) -> Result<usize, StorageUnavailable> {
        Ok(self.read_logs()?.medications.len())
    }

    /// Run `f` against both logs under one read lock, so derived reports
    /// see a single consistent state.
    pub fn view<R>(
        &self,
        f: impl FnOnce(&[SymptomEntry], &[MedicationEntry]) -> R,
    ) -> Result<R, StorageUnavailable> {
        let logs = self.read_logs()?;
        Ok(f(&logs.symptoms, &logs.medications))
    }

    fn read_logs(&self) -> Result<RwLockReadGuard<'_, Logs>, StorageUnavailable> {
        self.logs
            .read()
            .map_err(|_| StorageUnavailable("journal lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Logs>, StorageUnavailable> {
        self.logs
            .write()
            .map_err(|_| StorageUnavailable("journal lock poisoned".to_string()))
    }

    fn persist(&self, entry: &JournalEntry) -> Result<(), StorageUnavailable> {
        if let Some(sink) = &self.sink {
            sink.persist(entry).map_err(|e| {
                tracing::error!(entry_id = %entry.entry_id(), error = %e, "failed to persist entry");
                StorageUnavailable(format!("failed to persist entry: {}", e))
            })?;
        }
        Ok(())
    }
}

fn tail<T: Clone>(items: &[T], limit: Option<usize>) -> Vec<T> {
    let start = limit.map_or(0, |n| items.len().saturating_sub(n));
    items[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sev(v: i64) -> Severity {
        Severity::new(v).unwrap()
    }

    struct CountingSink(Arc<AtomicUsize>);

    impl EntrySink for CountingSink {
        fn persist(
            &self,
            _entry: &JournalEntry,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSink;

    impl EntrySink for FailingSink {
        fn persist(
            &self,
            _entry: &JournalEntry,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("disk full".into())
        }
    }

    #[test]
    fn append_symptom_assigns_id_and_timestamp() {
        let store = HealthStore::new();
        let before = Utc::now();
        let entry = store.append_symptom("  Headache ", sev(6), " after lunch ").unwrap();

        assert_eq!(entry.symptom_name, "Headache");
        assert_eq!(entry.notes, "after lunch");
        assert!(entry.timestamp >= before);
        assert_eq!(store.symptom_count().unwrap(), 1);
        assert_eq!(store.symptoms(None).unwrap()[0], entry);
    }

    #[test]
    fn blank_symptom_name_is_rejected_without_mutation() {
        let store = HealthStore::new();
        let err = store.append_symptom("   ", sev(3), "").unwrap_err();
        match err {
            StoreError::Invalid(v) => assert_eq!(v.field, Field::SymptomName),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(store.symptom_count().unwrap(), 0);
    }

    #[test]
    fn medication_requires_name_and_dosage() {
        let store = HealthStore::new();
        assert!(matches!(
            store.append_medication("aspirin", " ", None),
            Err(StoreError::Invalid(ValidationError { field: Field::Dosage, .. }))
        ));
        assert!(matches!(
            store.append_medication("", "100mg", None),
            Err(StoreError::Invalid(ValidationError { field: Field::MedicationName, .. }))
        ));
        assert!(matches!(
            store.append_medication("aspirin", "100mg", Some("teatime")),
            Err(StoreError::Invalid(ValidationError { field: Field::TimeTaken, .. }))
        ));
        assert_eq!(store.medication_count().unwrap(), 0);
    }

    #[test]
    fn medication_time_defaults_to_now() {
        let store = HealthStore::new();
        let before = Local::now().fixed_offset();
        let entry = store.append_medication("ibuprofen", "200mg", None).unwrap();
        assert!(entry.time_taken >= before);
    }

    #[test]
    fn read_keeps_insertion_order_and_limits_from_tail() {
        let store = HealthStore::new();
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            store.append_symptom(name, sev(i as i64 + 1), "").unwrap();
        }

        let all = store.symptoms(None).unwrap();
        let names: Vec<&str> = all.iter().map(|e| e.symptom_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);

        let last_two = store.read(EntryKind::Symptom, Some(2)).unwrap();
        assert_eq!(last_two.len(), 2);
        assert!(matches!(&last_two[0], JournalEntry::Symptom(s) if s.symptom_name == "c"));
        assert!(matches!(&last_two[1], JournalEntry::Symptom(s) if s.symptom_name == "d"));

        let oversized = store.read(EntryKind::Symptom, Some(99)).unwrap();
        assert_eq!(oversized.len(), 4);
    }

    #[test]
    fn reads_do_not_mutate_the_store() {
        let store = HealthStore::new();
        store.append_symptom("nausea", sev(4), "").unwrap();
        store.append_medication("ginger tea", "1 cup", None).unwrap();

        let first = store.read(EntryKind::Symptom, Some(1)).unwrap();
        let _ = store.read(EntryKind::Medication, None).unwrap();
        let second = store.read(EntryKind::Symptom, Some(1)).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.symptom_count().unwrap(), 1);
        assert_eq!(store.medication_count().unwrap(), 1);
    }

    #[test]
    fn sink_sees_every_successful_append() {
        let counter = Arc::new(AtomicUsize::new(0));
        let store = HealthStore::new().with_sink(Box::new(CountingSink(Arc::clone(&counter))));

        store.append_symptom("cough", sev(2), "").unwrap();
        let _ = store.append_symptom("", sev(2), "");
        store.append_medication("syrup", "10ml", None).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn sink_failure_is_fatal_and_leaves_no_entry() {
        let store = HealthStore::new().with_sink(Box::new(FailingSink));
        let err = store.append_symptom("fever", sev(5), "").unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.symptom_count().unwrap(), 0);
    }

    #[test]
    fn from_entries_preserves_order_per_kind() {
        let source = HealthStore::new();
        let a = source.append_symptom("a", sev(1), "").unwrap();
        let m = source.append_medication("m", "1 tablet", None).unwrap();
        let b = source.append_symptom("b", sev(2), "").unwrap();

        let rebuilt = HealthStore::from_entries(vec![
            JournalEntry::Symptom(a.clone()),
            JournalEntry::Medication(m.clone()),
            JournalEntry::Symptom(b.clone()),
        ]);

        assert_eq!(rebuilt.symptoms(None).unwrap(), vec![a, b]);
        assert_eq!(rebuilt.medications(None).unwrap(), vec![m]);
    }

    #[test]
    fn concurrent_appends_from_many_threads_are_all_kept() {
        let store = Arc::new(HealthStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .append_symptom(&format!("s{}-{}", t, i), sev(5), "")
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.symptom_count().unwrap(), 200);
    }
}
