use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};
use serde_json::Value;

use crate::collaborators::Collaborators;
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::settings::{required_input, Settings};

/// Field-level agreement between a JSON prediction and a structured ground truth.
///
/// Both sides are flattened to `path -> leaf` maps; each compared path scores
/// 1.0 on agreement and 0.0 otherwise. The score is the mean over compared paths.
pub struct JsonDiff;

/// Knobs read from the `predict_keys`, `compare_schema_only` and
/// `case_insensitive_keys` settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
	/// Also compare paths that only the prediction has.
	pub predict_keys: bool,
	/// Compare JSON types instead of values.
	pub compare_schema_only: bool,
	/// Lowercase paths before comparing.
	pub case_insensitive_keys: bool,
}

impl DiffOptions {
	fn from_settings(settings: &Settings<'_>) -> Result<Self> {
		Ok(Self {
			predict_keys: settings.bool_or("predict_keys", false)?,
			compare_schema_only: settings.bool_or("compare_schema_only", false)?,
			case_insensitive_keys: settings.bool_or("case_insensitive_keys", false)?,
		})
	}
}

#[async_trait]
impl Evaluator for JsonDiff {
	fn name(&self) -> &'static str {
		"json_diff"
	}

	async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
		let options = DiffOptions::from_settings(&Settings::new(&input.settings))?;
		let ground_truth = parse_if_text(required_input(&input.inputs, "ground_truth")?)?;
		let prediction = parse_if_text(required_input(&input.inputs, "prediction")?)?;

		let score = compare_json(&ground_truth, &prediction, options)?;
		Ok(EvaluatorOutput::score(score))
	}
}

// Predictions arrive as JSON text; ground truths from tabular test sets may too.
fn parse_if_text(value: &Value) -> Result<Value> {
	match value {
		Value::String(text) => Ok(serde_json::from_str(text)?),
		other => Ok(other.clone()),
	}
}

/// Flatten nested objects and arrays into `a.b.0.c`-style paths to scalar leaves.
pub fn flatten_json(value: &Value) -> BTreeMap<String, &Value> {
	fn walk<'v>(value: &'v Value, path: String, out: &mut BTreeMap<String, &'v Value>) {
		let child = |key: &str| if path.is_empty() { key.to_string() } else { format!("{path}.{key}") };
		match value {
			Value::Object(map) => {
				for (key, v) in map {
					walk(v, child(key), out);
				}
			}
			Value::Array(items) => {
				for (idx, v) in items.iter().enumerate() {
					walk(v, child(&idx.to_string()), out);
				}
			}
			leaf => {
				out.insert(path, leaf);
			}
		}
	}

	let mut out = BTreeMap::new();
	if value.is_object() || value.is_array() {
		walk(value, String::new(), &mut out);
	}
	out
}

/// Mean per-path agreement. Zero compared paths is an error, never NaN.
///
/// With `case_insensitive_keys`, ground-truth leaves whose paths differ only in
/// case are each scored; a leaf agrees if any prediction leaf at the folded
/// path agrees with it.
pub fn compare_json(ground_truth: &Value, prediction: &Value, options: DiffOptions) -> Result<f64> {
	let group = |flat: BTreeMap<String, &Value>| -> BTreeMap<String, Vec<Value>> {
		let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
		for (k, v) in flat {
			let k = if options.case_insensitive_keys { k.to_lowercase() } else { k };
			grouped.entry(k).or_default().push(v.clone());
		}
		grouped
	};
	let truth = group(flatten_json(ground_truth));
	let predicted = group(flatten_json(prediction));

	let mut keys: BTreeSet<&String> = truth.keys().collect();
	if options.predict_keys {
		keys.extend(predicted.keys());
	}

	if keys.is_empty() {
		return Err(EvalError::configuration(
			"JSON diff has no fields to compare: the ground truth has no leaf values.",
		));
	}

	let agree = |t: &Value, p: &Value| {
		if options.compare_schema_only {
			json_type(t) == json_type(p)
		} else {
			values_equal(t, p)
		}
	};

	let mut compared = 0usize;
	let mut total = 0.0;
	for key in keys {
		match truth.get(key) {
			Some(leaves) => {
				let candidates = predicted.get(key).map(Vec::as_slice).unwrap_or_default();
				for t in leaves {
					compared += 1;
					total += score(candidates.iter().any(|p| agree(t, p)));
				}
			}
			// Prediction-only path under `predict_keys`.
			None => compared += 1,
		}
	}

	Ok(total / compared as f64)
}

fn score(agree: bool) -> f64 {
	if agree { 1.0 } else { 0.0 }
}

// 1 and 1.0 are the same number in JSON.
fn values_equal(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
		_ => a == b,
	}
}

fn json_type(v: &Value) -> &'static str {
	match v {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	async fn diff(ground_truth: Value, prediction: &str, settings: Value) -> Result<f64> {
		let input = EvaluatorInput::new()
			.input("ground_truth", ground_truth)
			.input("prediction", prediction)
			.with_settings(settings.as_object().cloned().unwrap());
		let out = JsonDiff.evaluate(&input, &Collaborators::default()).await?;
		Ok(out.score_value().and_then(Value::as_f64).unwrap())
	}

	#[test]
	fn test_flatten_paths() {
		let v = json!({"a": {"b": [1, {"c": "x"}]}, "d": null});
		let flat = flatten_json(&v);
		let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
		assert_eq!(keys, vec!["a.b.0", "a.b.1.c", "d"]);
		assert_eq!(flat["a.b.1.c"], &json!("x"));
	}

	#[test]
	fn test_flatten_scalar_root_is_empty() {
		assert!(flatten_json(&json!(5)).is_empty());
	}

	#[tokio::test]
	async fn test_half_match() {
		let score = diff(json!({"a": 1, "b": 2}), r#"{"a": 1, "b": 3}"#, json!({})).await.unwrap();
		assert_eq!(score, 0.5);
	}

	#[tokio::test]
	async fn test_extra_prediction_keys_ignored_by_default() {
		let score = diff(json!({"a": 1}), r#"{"a": 1, "extra": true}"#, json!({})).await.unwrap();
		assert_eq!(score, 1.0);
	}

	#[tokio::test]
	async fn test_predict_keys_penalizes_extras() {
		let score = diff(json!({"a": 1}), r#"{"a": 1, "extra": true}"#, json!({"predict_keys": true}))
			.await
			.unwrap();
		assert_eq!(score, 0.5);
	}

	#[tokio::test]
	async fn test_schema_only_compares_types() {
		let gt = json!({"name": "John", "age": 30, "tags": ["x"]});
		let pred = r#"{"name": "Jane", "age": "thirty", "tags": ["y"]}"#;
		let score = diff(gt, pred, json!({"compare_schema_only": true})).await.unwrap();
		assert!((score - 2.0 / 3.0).abs() < 1e-9);
	}

	#[tokio::test]
	async fn test_case_insensitive_keys() {
		let gt = json!({"Name": "John"});
		assert_eq!(diff(gt.clone(), r#"{"name": "John"}"#, json!({})).await.unwrap(), 0.0);
		assert_eq!(
			diff(gt, r#"{"name": "John"}"#, json!({"case_insensitive_keys": true})).await.unwrap(),
			1.0
		);
	}

	#[tokio::test]
	async fn test_case_folded_collisions_are_counted_separately() {
		let gt = json!({"A": 1, "a": 2});
		let options = json!({"case_insensitive_keys": true});
		assert_eq!(diff(gt.clone(), r#"{"a": 2}"#, options.clone()).await.unwrap(), 0.5);
		assert_eq!(diff(gt, r#"{"a": 2, "A": 1}"#, options).await.unwrap(), 1.0);
	}

	#[tokio::test]
	async fn test_integer_and_float_agree() {
		assert_eq!(diff(json!({"x": 1}), r#"{"x": 1.0}"#, json!({})).await.unwrap(), 1.0);
	}

	#[tokio::test]
	async fn test_ground_truth_as_text() {
		let score = diff(json!(r#"{"a": 1, "b": 2}"#), r#"{"a": 1, "b": 2}"#, json!({})).await.unwrap();
		assert_eq!(score, 1.0);
	}

	#[tokio::test]
	async fn test_zero_keys_is_error() {
		let err = diff(json!({}), r#"{"a": 1}"#, json!({})).await.unwrap_err();
		assert!(err.to_string().contains("no fields to compare"));
	}

	#[tokio::test]
	async fn test_invalid_prediction_json_is_error() {
		let err = diff(json!({"a": 1}), "not json", json!({})).await.unwrap_err();
		assert!(matches!(err, EvalError::Json(_)));
	}
}
