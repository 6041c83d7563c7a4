// ABOUTME: Pattern aggregation over the symptom log: per-symptom frequency and mean severity.
// ABOUTME: Groups case-insensitively, then orders by count, mean severity, and name for deterministic output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entry::SymptomEntry;

/// Aggregate statistics for one symptom name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomPattern {
    /// Normalized (trimmed, lowercase) symptom name.
    pub name: String,
    pub count: usize,
    pub mean_severity: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternReport {
    pub patterns: Vec<SymptomPattern>,
    pub total_entries: usize,
}

impl PatternReport {
    pub fn is_empty(&self) -> bool {
        self.total_entries == 0
    }

    /// One line per pattern, e.g. `headache: 2x (avg severity 7.0)`.
    pub fn lines(&self) -> Vec<String> {
        self.patterns
            .iter()
            .map(|p| format!("{}: {}x (avg severity {:.1})", p.name, p.count, p.mean_severity))
            .collect()
    }

    /// Descriptive sentence for conversational replies.
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "No symptoms logged yet.".to_string();
        }
        format!(
            "Across {} symptom {}: {}.",
            self.total_entries,
            if self.total_entries == 1 { "entry" } else { "entries" },
            self.lines().join("; ")
        )
    }
}

/// Normalize a symptom name for grouping.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Aggregate a slice of symptom entries in one pass, then sort the groups
/// by descending count, descending mean severity, and ascending name.
pub fn aggregate(entries: &[SymptomEntry]) -> PatternReport {
    let mut groups: HashMap<String, (usize, u64)> = HashMap::new();

    for entry in entries {
        let slot = groups.entry(normalize_name(&entry.symptom_name)).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += u64::from(entry.severity.value());
    }

    let mut patterns: Vec<SymptomPattern> = groups
        .into_iter()
        .map(|(name, (count, severity_sum))| SymptomPattern {
            name,
            count,
            mean_severity: severity_sum as f64 / count as f64,
        })
        .collect();

    patterns.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.mean_severity.total_cmp(&a.mean_severity))
            .then_with(|| a.name.cmp(&b.name))
    });

    tracing::debug!(
        unique_symptoms = patterns.len(),
        total_entries = entries.len(),
        "pattern analysis complete"
    );

    PatternReport {
        patterns,
        total_entries: entries.len(),
    }
}
