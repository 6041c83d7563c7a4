// ABOUTME: The closed set of intents an utterance can carry, each with the fields extracted for its handler.
// ABOUTME: Also names the four specialist handlers and defines how partial symptom/medication fields merge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four specialist handlers an intent can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    Symptom,
    Medication,
    Pattern,
    Summary,
}

impl HandlerKind {
    /// Stable handler name used in logs and structured output.
    pub fn label(&self) -> &'static str {
        match self {
            HandlerKind::Symptom => "symptom_handler",
            HandlerKind::Medication => "medication_handler",
            HandlerKind::Pattern => "pattern_handler",
            HandlerKind::Summary => "summary_handler",
        }
    }

    /// Short topic shown in front of each part of a reply.
    pub fn topic(&self) -> &'static str {
        match self {
            HandlerKind::Symptom => "Symptom",
            HandlerKind::Medication => "Medication",
            HandlerKind::Pattern => "Patterns",
            HandlerKind::Summary => "Summary",
        }
    }
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Symptom fields as far as they are known. `severity` stays a raw JSON
/// value so the tool layer, not the extractor, decides whether it is valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SymptomFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MedicationFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_medications: Option<usize>,
}

/// One classified request inside an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Symptom(SymptomFields),
    Medication(MedicationFields),
    Pattern(PatternFields),
    Summary(SummaryFields),
    Unrecognized,
}

impl Intent {
    pub fn handler(&self) -> Option<HandlerKind> {
        match self {
            Intent::Symptom(_) => Some(HandlerKind::Symptom),
            Intent::Medication(_) => Some(HandlerKind::Medication),
            Intent::Pattern(_) => Some(HandlerKind::Pattern),
            Intent::Summary(_) => Some(HandlerKind::Summary),
            Intent::Unrecognized => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.handler().is_some()
    }
}

/// True when two optional item names can refer to the same thing: either
/// side unnamed, or equal ignoring case and surrounding whitespace.
pub fn same_item(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => true,
    }
}

fn at_most_one<T>(a: &Option<T>, b: &Option<T>) -> bool {
    a.is_none() || b.is_none()
}

fn take_newer<T>(slot: &mut Option<T>, newer: Option<T>) {
    if newer.is_some() {
        *slot = newer;
    }
}

impl SymptomFields {
    pub fn same_item(&self, other: &SymptomFields) -> bool {
        same_item(self.name.as_deref(), other.name.as_deref())
    }

    /// True when `newer` is the same symptom and only fills fields still
    /// missing here. A second severity means a second report.
    pub fn completes(&self, newer: &SymptomFields) -> bool {
        self.same_item(newer)
            && at_most_one(&self.severity, &newer.severity)
            && at_most_one(&self.notes, &newer.notes)
    }

    /// Fill in from `newer`; values it carries win.
    pub fn merge(&mut self, newer: SymptomFields) {
        take_newer(&mut self.name, newer.name);
        take_newer(&mut self.severity, newer.severity);
        take_newer(&mut self.notes, newer.notes);
    }
}

impl MedicationFields {
    pub fn same_item(&self, other: &MedicationFields) -> bool {
        same_item(self.name.as_deref(), other.name.as_deref())
    }

    /// True when `newer` is the same medication and only fills fields
    /// still missing here.
    pub fn completes(&self, newer: &MedicationFields) -> bool {
        self.same_item(newer)
            && at_most_one(&self.dosage, &newer.dosage)
            && at_most_one(&self.time_taken, &newer.time_taken)
    }

    pub fn merge(&mut self, newer: MedicationFields) {
        take_newer(&mut self.name, newer.name);
        take_newer(&mut self.dosage, newer.dosage);
        take_newer(&mut self.time_taken, newer.time_taken);
    }
}
