// ABOUTME: Core library for healthlog, containing journal entries, validation, the store, and the domain tools.
// ABOUTME: Everything here is independent of how utterances are classified or where entries are persisted.

pub mod entry;
pub mod patterns;
pub mod store;
pub mod summary;
pub mod tool_result;
pub mod tools;
pub mod validation;

pub use entry::{EntryKind, JournalEntry, MedicationEntry, SymptomEntry};
pub use patterns::{PatternReport, SymptomPattern, aggregate};
pub use store::{EntrySink, HealthStore, StorageUnavailable, StoreError};
pub use summary::{DEFAULT_RECENT_MEDICATIONS, HealthSummary, compose_summary};
pub use tool_result::{ToolResult, ToolStatus};
pub use tools::{
    AnalyzePatternsTool, HealthSummaryTool, LogSymptomTool, Tool, ToolSet, TrackMedicationTool,
    all_tool_definitions,
};
pub use validation::{Field, Severity, ValidationError};
