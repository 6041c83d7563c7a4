// ABOUTME: The four domain tools (log_symptom, track_medication, analyze_patterns, get_health_summary).
// ABOUTME: Each takes JSON params, runs against the shared HealthStore, and answers with a ToolResult envelope.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use serde_json::{Value, json};

use crate::patterns::aggregate;
use crate::store::{HealthStore, StorageUnavailable, StoreError};
use crate::summary::{DEFAULT_RECENT_MEDICATIONS, compose_summary};
use crate::tool_result::ToolResult;
use crate::validation::{Field, Severity, ValidationError, require_text};

pub const LOG_SYMPTOM: &str = "log_symptom";
pub const TRACK_MEDICATION: &str = "track_medication";
pub const ANALYZE_PATTERNS: &str = "analyze_patterns";
pub const GET_HEALTH_SUMMARY: &str = "get_health_summary";

/// A domain operation callable with JSON params. Anticipated failures come
/// back as an error `ToolResult`; only an unusable store is a Rust error.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the params object.
    fn schema(&self) -> Value;

    async fn execute(&self, params: Value) -> Result<ToolResult, StorageUnavailable>;
}

/// Provider-agnostic definitions (name, description, parameters) for all
/// four tools, in a fixed order.
pub fn all_tool_definitions() -> Vec<Value> {
    [
        (LOG_SYMPTOM, LOG_SYMPTOM_DESCRIPTION, log_symptom_schema()),
        (TRACK_MEDICATION, TRACK_MEDICATION_DESCRIPTION, track_medication_schema()),
        (ANALYZE_PATTERNS, ANALYZE_PATTERNS_DESCRIPTION, analyze_patterns_schema()),
        (GET_HEALTH_SUMMARY, GET_HEALTH_SUMMARY_DESCRIPTION, get_health_summary_schema()),
    ]
    .into_iter()
    .map(|(name, description, parameters)| {
        json!({
            "name": name,
            "description": description,
            "parameters": parameters
        })
    })
    .collect()
}

const LOG_SYMPTOM_DESCRIPTION: &str =
    "Log a symptom the user is experiencing, with a severity rating from 1 (mild) to 10 (worst imaginable).";
const TRACK_MEDICATION_DESCRIPTION: &str =
    "Record a medication the user took, with its dosage and optionally when it was taken.";
const ANALYZE_PATTERNS_DESCRIPTION: &str =
    "Summarize how often each logged symptom occurs and its average severity.";
const GET_HEALTH_SUMMARY_DESCRIPTION: &str =
    "Produce a summary of all logged symptoms and recent medications, suitable to share with a doctor.";

fn log_symptom_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "symptom_name": {
                "type": "string",
                "description": "Name of the symptom, e.g. 'headache' or 'nausea'."
            },
            "severity": {
                "type": "integer",
                "minimum": 1,
                "maximum": 10,
                "description": "Severity on a whole-number scale from 1 to 10."
            },
            "notes": {
                "type": "string",
                "description": "Optional free-text notes."
            }
        },
        "required": ["symptom_name", "severity"]
    })
}

fn track_medication_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "medication_name": {
                "type": "string",
                "description": "Name of the medication, e.g. 'aspirin'."
            },
            "dosage": {
                "type": "string",
                "description": "Amount taken, e.g. '500mg' or '2 tablets'."
            },
            "time_taken": {
                "type": "string",
                "description": "When it was taken: an RFC 3339 timestamp or a time like '08:30'. Defaults to now."
            }
        },
        "required": ["medication_name", "dosage"]
    })
}

fn analyze_patterns_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "window": {
                "type": "integer",
                "minimum": 1,
                "description": "Only analyze the most recent N symptom entries."
            }
        },
        "required": []
    })
}

fn get_health_summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "recent_medications": {
                "type": "integer",
                "minimum": 0,
                "description": "How many recent medications to list. Defaults to 5."
            }
        },
        "required": []
    })
}

/// Read an optional text param. Strings pass through, numbers are
/// stringified (a dosage of `500` is still a dosage), anything else is
/// rejected.
fn text_param(params: &Value, field: Field) -> Result<Option<String>, ValidationError> {
    match params.get(field.key()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(ValidationError::new(
            field,
            format!("The {} must be text.", field.describe()),
        )),
    }
}

/// Read an optional non-negative count param.
fn count_param(params: &Value, key: &str) -> Result<Option<usize>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| format!("'{}' must be a non-negative whole number.", key)),
    }
}

fn store_result<T>(
    tool: &str,
    outcome: Result<T, StoreError>,
    on_success: impl FnOnce(T) -> ToolResult,
) -> Result<ToolResult, StorageUnavailable> {
    match outcome {
        Ok(value) => Ok(on_success(value)),
        Err(StoreError::Invalid(err)) => {
            tracing::warn!(tool, field = %err.field, error = %err, "tool input rejected");
            Ok(ToolResult::invalid(&err))
        }
        Err(StoreError::Unavailable(err)) => Err(err),
    }
}

/// Logs a symptom with its severity.
#[derive(Clone)]
pub struct LogSymptomTool {
    store: Arc<HealthStore>,
}

impl LogSymptomTool {
    pub fn new(store: Arc<HealthStore>) -> Self {
        Self { store }
    }

    fn validate(params: &Value) -> Result<(String, Severity, String), ValidationError> {
        let name = require_text(
            Field::SymptomName,
            &text_param(params, Field::SymptomName)?.unwrap_or_default(),
        )?;
        let severity = Severity::from_json(params.get(Field::Severity.key()).unwrap_or(&Value::Null))?;
        let notes = text_param(params, Field::Notes)?.unwrap_or_default();
        Ok((name, severity, notes))
    }
}

#[async_trait]
impl Tool for LogSymptomTool {
    fn name(&self) -> &str {
        LOG_SYMPTOM
    }

    fn description(&self) -> &str {
        LOG_SYMPTOM_DESCRIPTION
    }

    fn schema(&self) -> Value {
        log_symptom_schema()
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, StorageUnavailable> {
        tracing::info!(tool = LOG_SYMPTOM, "tool called");

        let outcome = Self::validate(&params)
            .map_err(StoreError::from)
            .and_then(|(name, severity, notes)| self.store.append_symptom(&name, severity, &notes));

        store_result(LOG_SYMPTOM, outcome, |entry| {
            ToolResult::success(
                format!("Logged {} (severity {}).", entry.symptom_name, entry.severity),
                serde_json::to_value(&entry).ok(),
            )
        })
    }
}

/// Records a medication intake.
#[derive(Clone)]
pub struct TrackMedicationTool {
    store: Arc<HealthStore>,
}

impl TrackMedicationTool {
    pub fn new(store: Arc<HealthStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for TrackMedicationTool {
    fn name(&self) -> &str {
        TRACK_MEDICATION
    }

    fn description(&self) -> &str {
        TRACK_MEDICATION_DESCRIPTION
    }

    fn schema(&self) -> Value {
        track_medication_schema()
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, StorageUnavailable> {
        tracing::info!(tool = TRACK_MEDICATION, "tool called");

        let fields = text_param(&params, Field::MedicationName).and_then(|name| {
            Ok((
                name.unwrap_or_default(),
                text_param(&params, Field::Dosage)?.unwrap_or_default(),
                text_param(&params, Field::TimeTaken)?,
            ))
        });

        let outcome = fields.map_err(StoreError::from).and_then(|(name, dosage, when)| {
            self.store.append_medication(&name, &dosage, when.as_deref())
        });

        store_result(TRACK_MEDICATION, outcome, |entry| {
            ToolResult::success(
                format!("Tracked {} ({}).", entry.medication_name, entry.dosage),
                serde_json::to_value(&entry).ok(),
            )
        })
    }
}

/// Aggregates symptom frequency and severity. Read-only.
#[derive(Clone)]
pub struct AnalyzePatternsTool {
    store: Arc<HealthStore>,
}

impl AnalyzePatternsTool {
    pub fn new(store: Arc<HealthStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AnalyzePatternsTool {
    fn name(&self) -> &str {
        ANALYZE_PATTERNS
    }

    fn description(&self) -> &str {
        ANALYZE_PATTERNS_DESCRIPTION
    }

    fn schema(&self) -> Value {
        analyze_patterns_schema()
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, StorageUnavailable> {
        tracing::info!(tool = ANALYZE_PATTERNS, "tool called");

        let window = match count_param(&params, "window") {
            Ok(Some(0)) => return Ok(ToolResult::error("'window' must be at least 1.")),
            Ok(w) => w,
            Err(msg) => return Ok(ToolResult::error(msg)),
        };

        let entries = self.store.symptoms(window)?;
        let report = aggregate(&entries);

        tracing::info!(
            unique_symptoms = report.patterns.len(),
            total_entries = report.total_entries,
            "analysis complete"
        );

        Ok(ToolResult::success(
            report.describe(),
            serde_json::to_value(&report).ok(),
        ))
    }
}

/// Composes the doctor-visit summary. Read-only.
#[derive(Clone)]
pub struct HealthSummaryTool {
    store: Arc<HealthStore>,
}

impl HealthSummaryTool {
    pub fn new(store: Arc<HealthStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for HealthSummaryTool {
    fn name(&self) -> &str {
        GET_HEALTH_SUMMARY
    }

    fn description(&self) -> &str {
        GET_HEALTH_SUMMARY_DESCRIPTION
    }

    fn schema(&self) -> Value {
        get_health_summary_schema()
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, StorageUnavailable> {
        tracing::info!(tool = GET_HEALTH_SUMMARY, "tool called");

        let recent = match count_param(&params, "recent_medications") {
            Ok(n) => n.unwrap_or(DEFAULT_RECENT_MEDICATIONS),
            Err(msg) => return Ok(ToolResult::error(msg)),
        };

        let today = Local::now().date_naive();
        let summary = self
            .store
            .view(|symptoms, medications| compose_summary(symptoms, medications, today, recent))?;

        tracing::info!("health summary generated");

        Ok(ToolResult::success(
            summary.text.clone(),
            serde_json::to_value(&summary).ok(),
        ))
    }
}

/// The four tools bound to one store.
#[derive(Clone)]
pub struct ToolSet {
    pub log_symptom: LogSymptomTool,
    pub track_medication: TrackMedicationTool,
    pub analyze_patterns: AnalyzePatternsTool,
    pub health_summary: HealthSummaryTool,
}

impl ToolSet {
    pub fn new(store: Arc<HealthStore>) -> Self {
        Self {
            log_symptom: LogSymptomTool::new(Arc::clone(&store)),
            track_medication: TrackMedicationTool::new(Arc::clone(&store)),
            analyze_patterns: AnalyzePatternsTool::new(Arc::clone(&store)),
            health_summary: HealthSummaryTool::new(store),
        }
    }

    /// Look a tool up by its registered name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        match name {
            LOG_SYMPTOM => Some(&self.log_symptom),
            TRACK_MEDICATION => Some(&self.track_medication),
            ANALYZE_PATTERNS => Some(&self.analyze_patterns),
            GET_HEALTH_SUMMARY => Some(&self.health_summary),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_result::ToolStatus;

    #[tokio::test]
    async fn tool_set_shares_one_store() {
        let s = store();
        let tools = ToolSet::new(Arc::clone(&s));
        let log = tools.get(LOG_SYMPTOM).unwrap();
        log.execute(json!({ "symptom_name": "cough", "severity": 3 }))
            .await
            .unwrap();

        let analyze = tools.get(ANALYZE_PATTERNS).unwrap();
        let report = analyze.execute(json!({})).await.unwrap();
        assert_eq!(report.data.unwrap()["total_entries"], 1);
        assert!(tools.get("delete_everything").is_none());
    }

    fn store() -> Arc<HealthStore> {
        Arc::new(HealthStore::new())
    }

    #[test]
    fn definitions_cover_all_four_tools_in_order() {
        let defs = all_tool_definitions();
        let names: Vec<&str> = defs.iter().filter_map(|d| d["name"].as_str()).collect();
        assert_eq!(
            names,
            vec![LOG_SYMPTOM, TRACK_MEDICATION, ANALYZE_PATTERNS, GET_HEALTH_SUMMARY]
        );
        for def in &defs {
            assert!(def["description"].as_str().is_some());
            assert_eq!(def["parameters"]["type"], "object");
            assert!(def["parameters"]["required"].is_array());
        }
    }

    #[test]
    fn tool_schema_matches_definition() {
        let s = store();
        let tool = LogSymptomTool::new(Arc::clone(&s));
        let defs = all_tool_definitions();
        assert_eq!(tool.schema(), defs[0]["parameters"]);
        assert_eq!(tool.name(), defs[0]["name"]);
        assert_eq!(tool.description(), defs[0]["description"]);
    }

    #[tokio::test]
    async fn log_symptom_succeeds_only_for_whole_numbers_in_range() {
        let s = store();
        let tool = LogSymptomTool::new(Arc::clone(&s));

        for v in 1..=10 {
            let result = tool
                .execute(json!({ "symptom_name": "headache", "severity": v }))
                .await
                .unwrap();
            assert!(result.is_success(), "severity {} should succeed", v);
        }
        assert_eq!(s.symptom_count().unwrap(), 10);

        for bad in [json!(0), json!(11), json!(-1), json!(3.5)] {
            let result = tool
                .execute(json!({ "symptom_name": "headache", "severity": bad }))
                .await
                .unwrap();
            assert_eq!(result.status, ToolStatus::Error, "severity {} should fail", bad);
            assert_eq!(result.error_field(), Some(Field::Severity));
            assert!(result.message.contains("between 1 and 10"));
        }
        assert_eq!(s.symptom_count().unwrap(), 10, "failed calls must not mutate");
    }

    #[tokio::test]
    async fn log_symptom_rejects_blank_name_before_severity() {
        let s = store();
        let tool = LogSymptomTool::new(Arc::clone(&s));
        let result = tool
            .execute(json!({ "symptom_name": "  ", "severity": 42 }))
            .await
            .unwrap();
        assert_eq!(result.error_field(), Some(Field::SymptomName));
        assert_eq!(s.symptom_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn log_symptom_echoes_entry() {
        let s = store();
        let tool = LogSymptomTool::new(Arc::clone(&s));
        let result = tool
            .execute(json!({ "symptom_name": "nausea", "severity": "4", "notes": "after coffee" }))
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.message, "Logged nausea (severity 4).");
        let data = result.data.unwrap();
        assert_eq!(data["symptom_name"], "nausea");
        assert_eq!(data["severity"], 4);
        assert_eq!(data["notes"], "after coffee");
    }

    #[tokio::test]
    async fn track_medication_defaults_time_and_reports_missing_dosage() {
        let s = store();
        let tool = TrackMedicationTool::new(Arc::clone(&s));

        let missing = tool
            .execute(json!({ "medication_name": "aspirin" }))
            .await
            .unwrap();
        assert_eq!(missing.error_field(), Some(Field::Dosage));

        let ok = tool
            .execute(json!({ "medication_name": "aspirin", "dosage": "500mg" }))
            .await
            .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.message, "Tracked aspirin (500mg).");
        assert!(ok.data.unwrap()["time_taken"].as_str().is_some());
        assert_eq!(s.medication_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn track_medication_rejects_non_text_name() {
        let s = store();
        let tool = TrackMedicationTool::new(Arc::clone(&s));
        let result = tool
            .execute(json!({ "medication_name": ["aspirin"], "dosage": "1" }))
            .await
            .unwrap();
        assert_eq!(result.error_field(), Some(Field::MedicationName));
    }

    #[tokio::test]
    async fn analyze_patterns_on_empty_store_is_success() {
        let tool = AnalyzePatternsTool::new(store());
        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.message, "No symptoms logged yet.");
        assert_eq!(result.data.unwrap()["total_entries"], 0);
    }

    #[tokio::test]
    async fn analyze_patterns_honours_window() {
        let s = store();
        let log = LogSymptomTool::new(Arc::clone(&s));
        for (name, sev) in [("headache", 8), ("headache", 6), ("nausea", 5)] {
            log.execute(json!({ "symptom_name": name, "severity": sev }))
                .await
                .unwrap();
        }

        let tool = AnalyzePatternsTool::new(Arc::clone(&s));
        let full = tool.execute(json!({})).await.unwrap();
        let data = full.data.unwrap();
        assert_eq!(data["total_entries"], 3);
        assert_eq!(data["patterns"][0]["name"], "headache");
        assert_eq!(data["patterns"][0]["count"], 2);
        assert_eq!(data["patterns"][0]["mean_severity"], 7.0);

        let windowed = tool.execute(json!({ "window": 1 })).await.unwrap();
        assert_eq!(windowed.data.unwrap()["patterns"][0]["name"], "nausea");

        let bad = tool.execute(json!({ "window": 0 })).await.unwrap();
        assert!(bad.is_error());
    }

    #[tokio::test]
    async fn summary_on_empty_store_reports_zero_counts() {
        let tool = HealthSummaryTool::new(store());
        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.is_success());
        assert!(result.message.contains("Symptoms logged: 0"));
        assert!(result.message.contains("Medications tracked: 0"));
        let data = result.data.unwrap();
        assert_eq!(data["symptom_count"], 0);
        assert_eq!(data["patterns"]["patterns"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn summary_rejects_malformed_count() {
        let tool = HealthSummaryTool::new(store());
        let result = tool
            .execute(json!({ "recent_medications": "lots" }))
            .await
            .unwrap();
        assert!(result.is_error());
        assert_eq!(result.error_field(), None);
    }
}
