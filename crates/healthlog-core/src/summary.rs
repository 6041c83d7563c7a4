// ABOUTME: Composes the deterministic health summary report intended for doctor visits.
// ABOUTME: Combines entry counts, the pattern report, and the most recent medications into structured data and text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entry::{MedicationEntry, SymptomEntry};
use crate::patterns::{PatternReport, aggregate};

/// Number of recent medications listed when the caller does not say.
pub const DEFAULT_RECENT_MEDICATIONS: usize = 5;

const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub date: NaiveDate,
    pub symptom_count: usize,
    pub medication_count: usize,
    pub patterns: PatternReport,
    /// Most recent first.
    pub recent_medications: Vec<MedicationEntry>,
    pub text: String,
}

/// Build the summary from both logs. Output depends only on the inputs.
pub fn compose_summary(
    symptoms: &[SymptomEntry],
    medications: &[MedicationEntry],
    date: NaiveDate,
    recent_medications: usize,
) -> HealthSummary {
    let patterns = aggregate(symptoms);
    let recent: Vec<MedicationEntry> = medications
        .iter()
        .rev()
        .take(recent_medications)
        .cloned()
        .collect();

    let mut text = format!("Health Summary - {}\n", date.format("%Y-%m-%d"));
    text.push_str(&"=".repeat(RULE_WIDTH));
    text.push('\n');
    text.push_str(&format!("Symptoms logged: {}\n", symptoms.len()));
    text.push_str(&format!("Medications tracked: {}\n", medications.len()));

    text.push_str("\nSymptom patterns:\n");
    if patterns.patterns.is_empty() {
        text.push_str("  (none logged)\n");
    } else {
        for line in patterns.lines() {
            text.push_str(&format!("  - {}\n", line));
        }
    }

    text.push_str("\nRecent medications:\n");
    if recent.is_empty() {
        text.push_str("  (none logged)\n");
    } else {
        for med in &recent {
            text.push_str(&format!(
                "  - {} ({}) taken {}\n",
                med.medication_name,
                med.dosage,
                med.time_taken.format("%Y-%m-%d %H:%M %:z")
            ));
        }
    }

    text.push_str("\nSelf-reported entries only; this summary is not a diagnosis.\n");

    HealthSummary {
        date,
        symptom_count: symptoms.len(),
        medication_count: medications.len(),
        patterns,
        recent_medications: recent,
        text,
    }
}
