use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabled::{Table, Tabled};

/// String-keyed JSON object used for inputs, settings, credentials and outputs.
pub type JsonMap = Map<String, Value>;

/// Discriminator of an [`Outcome`], serialized as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
	Bool,
	Number,
	Text,
	Error,
}

impl fmt::Display for OutcomeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			OutcomeKind::Bool => "bool",
			OutcomeKind::Number => "number",
			OutcomeKind::Text => "text",
			OutcomeKind::Error => "error",
		};
		f.write_str(s)
	}
}

/// Failure details attached to an error outcome.
///
/// `stacktrace` is absent for configuration problems the user can fix and
/// carries the error chain for internal or external faults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeError {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stacktrace: Option<String>,
}

/// Uniform result of one evaluator invocation.
///
/// Serializes as `{"type": "...", "value": ...}` for value kinds and
/// `{"type": "error", "value": null, "error": {...}}` for failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "OutcomeRecord", try_from = "OutcomeRecord")]
pub enum Outcome {
	Bool(bool),
	Number(f64),
	Text(String),
	Error(OutcomeError),
}

impl Outcome {
	/// Error outcome without diagnostic detail (user configuration problem).
	pub fn error(message: impl Into<String>) -> Self {
		Outcome::Error(OutcomeError { message: message.into(), stacktrace: None })
	}

	/// Error outcome with diagnostic detail (internal or external fault).
	pub fn error_with_trace(message: impl Into<String>, stacktrace: impl Into<String>) -> Self {
		Outcome::Error(OutcomeError {
			message: message.into(),
			stacktrace: Some(stacktrace.into()),
		})
	}

	pub fn kind(&self) -> OutcomeKind {
		match self {
			Outcome::Bool(_) => OutcomeKind::Bool,
			Outcome::Number(_) => OutcomeKind::Number,
			Outcome::Text(_) => OutcomeKind::Text,
			Outcome::Error(_) => OutcomeKind::Error,
		}
	}

	pub fn is_error(&self) -> bool {
		matches!(self, Outcome::Error(_))
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Outcome::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Outcome::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Outcome::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn error_details(&self) -> Option<&OutcomeError> {
		match self {
			Outcome::Error(e) => Some(e),
			_ => None,
		}
	}

	/// The JSON `value` field; `null` for errors.
	pub fn value(&self) -> Value {
		match self {
			Outcome::Bool(b) => Value::Bool(*b),
			Outcome::Number(n) => serde_json::Number::from_f64(*n)
				.map(Value::Number)
				.unwrap_or(Value::Null),
			Outcome::Text(s) => Value::String(s.clone()),
			Outcome::Error(_) => Value::Null,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OutcomeRecord {
	#[serde(rename = "type")]
	kind: OutcomeKind,
	#[serde(default)]
	value: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	error: Option<OutcomeError>,
}

impl From<Outcome> for OutcomeRecord {
	fn from(outcome: Outcome) -> Self {
		let kind = outcome.kind();
		let value = outcome.value();
		let error = match outcome {
			Outcome::Error(e) => Some(e),
			_ => None,
		};
		OutcomeRecord { kind, value, error }
	}
}

impl TryFrom<OutcomeRecord> for Outcome {
	type Error = String;

	fn try_from(record: OutcomeRecord) -> Result<Self, String> {
		let mismatch = || format!("value {} does not match result type '{}'", record.value, record.kind);
		match record.kind {
			OutcomeKind::Bool => record.value.as_bool().map(Outcome::Bool).ok_or_else(mismatch),
			OutcomeKind::Number => record.value.as_f64().map(Outcome::Number).ok_or_else(mismatch),
			OutcomeKind::Text => record
				.value
				.as_str()
				.map(|s| Outcome::Text(s.to_string()))
				.ok_or_else(mismatch),
			OutcomeKind::Error => record
				.error
				.clone()
				.map(Outcome::Error)
				.ok_or_else(|| "error result without an 'error' field".to_string()),
		}
	}
}

/// Structured input of a single evaluator call.
///
/// `inputs` always carries `prediction` and, where the evaluator compares
/// against a reference, `ground_truth`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorInput {
	#[serde(default)]
	pub inputs: JsonMap,
	#[serde(default)]
	pub settings: JsonMap,
	#[serde(default)]
	pub credentials: JsonMap,
}

impl EvaluatorInput {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.inputs.insert(key.into(), value.into());
		self
	}

	pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.settings.insert(key.into(), value.into());
		self
	}

	pub fn credential(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.credentials.insert(key.into(), value.into());
		self
	}

	pub fn with_settings(mut self, settings: JsonMap) -> Self {
		self.settings = settings;
		self
	}

	pub fn with_credentials(mut self, credentials: JsonMap) -> Self {
		self.credentials = credentials;
		self
	}

	pub fn prediction(&self) -> Option<&Value> {
		self.inputs.get("prediction")
	}

	pub fn ground_truth(&self) -> Option<&Value> {
		self.inputs.get("ground_truth")
	}
}

/// Raw output of an evaluator call, e.g. `{"success": true}` or `{"score": 0.5}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorOutput {
	#[serde(default)]
	pub outputs: JsonMap,
}

impl EvaluatorOutput {
	pub fn success(success: bool) -> Self {
		Self::default().with("success", success)
	}

	pub fn score(score: impl Into<Value>) -> Self {
		Self::default().with("score", score)
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.outputs.insert(key.into(), value.into());
		self
	}

	pub fn success_flag(&self) -> Option<bool> {
		self.outputs.get("success").and_then(Value::as_bool)
	}

	pub fn score_value(&self) -> Option<&Value> {
		self.outputs.get("score")
	}
}

/// Input of the field-mapping operation: output key -> path expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingInput {
	pub inputs: Value,
	pub mapping: BTreeMap<String, String>,
}

/// Resolved field mapping; unresolved paths map to `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingOutput {
	pub outputs: JsonMap,
}

/// One evaluated call as reported by a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub evaluator: String,
	pub result: Outcome,
}

#[derive(Debug, Clone, Tabled)]
struct RecordRow {
	id: String,
	evaluator: String,
	#[tabled(rename = "type")]
	kind: String,
	value: String,
	error: String,
}

/// Render records as a table followed by a one-line summary.
pub fn summary_table(records: &[EvaluationRecord]) -> String {
	let rows: Vec<RecordRow> = records.iter().map(|r| {
		let error = r.result.error_details().map(|e| e.message.clone()).unwrap_or_default();
		RecordRow {
			id: r.id.clone().unwrap_or_else(|| "-".to_string()),
			evaluator: r.evaluator.clone(),
			kind: r.result.kind().to_string(),
			value: truncate(value_preview(&r.result.value()), 48),
			error: truncate(error, 64),
		}
	}).collect();

	let table_str = Table::new(rows).to_string();

	let total = records.len();
	let errors = records.iter().filter(|r| r.result.is_error()).count();
	let verdicts: Vec<bool> = records.iter().filter_map(|r| r.result.as_bool()).collect();
	let passed = verdicts.iter().filter(|b| **b).count();

	let summary_text = format!(
		"Total: {}  Errors: {}  Passed: {}/{}",
		total,
		errors,
		passed,
		verdicts.len()
	);

	format!("{}\n\n{}\n", table_str, summary_text)
}

fn value_preview(v: &Value) -> String {
	match v {
		Value::String(s) => s.clone(),
		Value::Null => String::new(),
		_ => v.to_string(),
	}
}

fn truncate(s: String, max_len: usize) -> String {
	if s.chars().count() <= max_len {
		return s;
	}
	let mut truncated = s.chars().take(max_len.saturating_sub(1)).collect::<String>();
	truncated.push('…');
	truncated
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_outcome_serializes_with_type_tag() {
		let v = serde_json::to_value(Outcome::Bool(true)).unwrap();
		assert_eq!(v, json!({"type": "bool", "value": true}));

		let v = serde_json::to_value(Outcome::Number(0.5)).unwrap();
		assert_eq!(v, json!({"type": "number", "value": 0.5}));
	}

	#[test]
	fn test_error_outcome_has_null_value() {
		let v = serde_json::to_value(Outcome::error("No correct answer keys provided.")).unwrap();
		assert_eq!(
			v,
			json!({"type": "error", "value": null, "error": {"message": "No correct answer keys provided."}})
		);
	}

	#[test]
	fn test_outcome_rejects_mismatched_value() {
		let err = serde_json::from_value::<Outcome>(json!({"type": "bool", "value": "yes"}));
		assert!(err.is_err());

		let err = serde_json::from_value::<Outcome>(json!({"type": "error", "value": null}));
		assert!(err.is_err());
	}

	#[test]
	fn test_outcome_parses_error_with_stacktrace() {
		let outcome: Outcome = serde_json::from_value(json!({
			"type": "error",
			"error": {"message": "boom", "stacktrace": "caused by: io"}
		}))
		.unwrap();
		let details = outcome.error_details().unwrap();
		assert_eq!(details.message, "boom");
		assert_eq!(details.stacktrace.as_deref(), Some("caused by: io"));
	}

	#[test]
	fn test_evaluator_input_builder() {
		let input = EvaluatorInput::new()
			.input("prediction", "42")
			.input("ground_truth", 42)
			.setting("case_sensitive", false);
		assert_eq!(input.prediction(), Some(&json!("42")));
		assert_eq!(input.ground_truth(), Some(&json!(42)));
		assert_eq!(input.settings.get("case_sensitive"), Some(&json!(false)));
	}

	#[test]
	fn test_evaluator_input_defaults_missing_maps() {
		let input: EvaluatorInput = serde_json::from_value(json!({"inputs": {"prediction": "x"}})).unwrap();
		assert!(input.settings.is_empty());
		assert!(input.credentials.is_empty());
	}

	#[test]
	fn test_summary_table_counts() {
		let records = vec![
			EvaluationRecord { id: Some("a".into()), evaluator: "auto_exact_match".into(), result: Outcome::Bool(true) },
			EvaluationRecord { id: None, evaluator: "auto_exact_match".into(), result: Outcome::Bool(false) },
			EvaluationRecord { id: None, evaluator: "nope".into(), result: Outcome::error("Evaluation method 'nope' not found.") },
		];
		let table = summary_table(&records);
		assert!(table.contains("Total: 3  Errors: 1  Passed: 1/2"));
		assert!(table.contains("auto_exact_match"));
	}
}
