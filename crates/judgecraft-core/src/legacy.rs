//! The six-slot calling convention: `(inputs, output, data_point,
//! app_params, settings, credentials)` in, an [`Outcome`] out.
//!
//! Each call is adapted into an [`EvaluatorInput`], run through the shared
//! dispatcher, and the output typed according to the evaluator family.
//! Nothing escapes as an error: failures become error outcomes.

use judgecraft_types::{EvaluatorInput, EvaluatorOutput, JsonMap, Outcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{EvalError, Result};
use crate::registry::{Engine, EvaluatorKind, ResultShape};
use crate::settings::{stringify, Settings};

/// One legacy evaluation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyCall {
	/// App inputs of the test case. Accepted for wire compatibility; evaluator
	/// inputs are rebuilt from `output` and `data_point`, so this is not read.
	pub inputs: JsonMap,
	pub output: Value,
	pub data_point: JsonMap,
	pub app_params: JsonMap,
	pub settings: JsonMap,
	pub credentials: JsonMap,
}

impl LegacyCall {
	pub fn new(output: impl Into<Value>) -> Self {
		Self { output: output.into(), ..Self::default() }
	}

	pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.data_point.insert(key.into(), value.into());
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

	pub fn app_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.app_params.insert(key.into(), value.into());
		self
	}
}

/// The data-point field named by the `correct_answer_key` setting.
pub fn correct_answer<'a>(data_point: &'a JsonMap, settings: &JsonMap) -> Result<&'a Value> {
	let key = Settings::new(settings)
		.optional_str("correct_answer_key")?
		.ok_or_else(|| EvalError::configuration("No correct answer keys provided."))?;
	data_point
		.get(key)
		.ok_or_else(|| EvalError::configuration(format!("Correct answer column '{key}' not found in the test set.")))
}

/// Build the evaluator input a legacy call maps to.
pub fn adapt(kind: EvaluatorKind, call: &LegacyCall) -> Result<EvaluatorInput> {
	let mut input = EvaluatorInput::new()
		.input("prediction", call.output.clone())
		.with_settings(call.settings.clone())
		.with_credentials(call.credentials.clone());

	match kind {
		EvaluatorKind::ExactMatch
		| EvaluatorKind::FieldMatch
		| EvaluatorKind::WebhookTest
		| EvaluatorKind::JsonDiff
		| EvaluatorKind::SemanticSimilarity
		| EvaluatorKind::LevenshteinDistance
		| EvaluatorKind::SimilarityMatch => {
			input = input.input("ground_truth", correct_answer(&call.data_point, &call.settings)?.clone());
		}
		EvaluatorKind::RegexTest => {
			input = input.input("ground_truth", Value::Object(call.data_point.clone()));
		}
		EvaluatorKind::CustomCodeRun => {
			input = input
				.input("ground_truth", correct_answer(&call.data_point, &call.settings)?.clone())
				.input("app_config", Value::Object(call.app_params.clone()));
		}
		EvaluatorKind::AiCritique => {
			let prompt_user = call.app_params.get("prompt_user").cloned().unwrap_or_else(|| Value::from(""));
			input = input
				.input("ground_truth", correct_answer(&call.data_point, &call.settings)?.clone())
				.input("prompt_user", prompt_user);
		}
		EvaluatorKind::StartsWith
		| EvaluatorKind::EndsWith
		| EvaluatorKind::Contains
		| EvaluatorKind::ContainsAny
		| EvaluatorKind::ContainsAll
		| EvaluatorKind::ContainsJson
		| EvaluatorKind::RagFaithfulness
		| EvaluatorKind::RagContextRelevancy => {}
	}
	Ok(input)
}

/// Type an evaluator output the way the legacy caller expects.
pub fn to_outcome(kind: EvaluatorKind, output: &EvaluatorOutput) -> Result<Outcome> {
	let missing = |what: &str| EvalError::external(kind.key(), format!("evaluator returned no {what}"));
	let number = || {
		output
			.score_value()
			.and_then(Value::as_f64)
			.map(Outcome::Number)
			.ok_or_else(|| missing("numeric score"))
	};

	match kind.result_shape() {
		ResultShape::Bool => output.success_flag().map(Outcome::Bool).ok_or_else(|| missing("success flag")),
		ResultShape::Number => number(),
		ResultShape::Text => output
			.score_value()
			.map(|v| Outcome::Text(stringify(v)))
			.ok_or_else(|| missing("text score")),
		ResultShape::Auto => match output.success_flag() {
			Some(flag) => Ok(Outcome::Bool(flag)),
			None => number(),
		},
	}
}

impl Engine {
	/// Run a legacy call. Every failure, including an unknown key, comes back
	/// as an error outcome.
	pub async fn evaluate(&self, key: &str, call: &LegacyCall) -> Outcome {
		let Some(kind) = EvaluatorKind::from_key(key) else {
			warn!(evaluator = key, "unknown evaluator key");
			return Outcome::error(format!("Evaluation method '{key}' not found."));
		};

		let result = match adapt(kind, call) {
			Ok(input) => self
				.dispatch(kind, &input)
				.await
				.and_then(|output| to_outcome(kind, &output)),
			Err(err) => Err(err),
		};

		result.unwrap_or_else(|err| {
			warn!(evaluator = key, error = %err, "evaluation failed");
			err.into_outcome(kind.label())
		})
	}

	/// Blocking form of [`Engine::evaluate`] on a runtime owned by the host.
	pub fn evaluate_blocking(&self, runtime: &tokio::runtime::Runtime, key: &str, call: &LegacyCall) -> Outcome {
		runtime.block_on(self.evaluate(key, call))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collaborators::Collaborators;
	use crate::testing::{chat_fn, sandbox_fn};
	use judgecraft_types::OutcomeKind;
	use serde_json::json;

	#[tokio::test]
	async fn test_unknown_key_is_error_outcome() {
		let outcome = Engine::default().evaluate("auto_magic", &LegacyCall::new("x")).await;
		let details = outcome.error_details().unwrap();
		assert_eq!(details.message, "Evaluation method 'auto_magic' not found.");
		assert!(details.stacktrace.is_none());
	}

	#[tokio::test]
	async fn test_exact_match_reads_correct_answer() {
		let call = LegacyCall::new("42").data("answer", "42").setting("correct_answer_key", "answer");
		assert_eq!(Engine::default().evaluate("auto_exact_match", &call).await, Outcome::Bool(true));

		let call = LegacyCall::new(42).data("answer", "42").setting("correct_answer_key", "answer");
		assert_eq!(Engine::default().evaluate("auto_exact_match", &call).await, Outcome::Bool(false));
	}

	#[tokio::test]
	async fn test_correct_answer_errors() {
		let engine = Engine::default();
		let outcome = engine.evaluate("auto_exact_match", &LegacyCall::new("a")).await;
		assert_eq!(outcome.error_details().unwrap().message, "No correct answer keys provided.");

		let call = LegacyCall::new("a").setting("correct_answer_key", "expected");
		let outcome = engine.evaluate("auto_exact_match", &call).await;
		let details = outcome.error_details().unwrap();
		assert_eq!(details.message, "Correct answer column 'expected' not found in the test set.");
		assert!(details.stacktrace.is_none());
	}

	#[test]
	fn test_app_inputs_are_not_forwarded() {
		let mut call = LegacyCall::new("Paris").data("answer", "Paris").setting("correct_answer_key", "answer");
		call.inputs.insert("country".into(), json!("France"));
		call.inputs.insert("prediction".into(), json!("overridden?"));

		let input = adapt(EvaluatorKind::ExactMatch, &call).unwrap();
		assert_eq!(input.inputs.len(), 2);
		assert_eq!(input.prediction(), Some(&json!("Paris")));
		assert!(!input.inputs.contains_key("country"));
	}

	#[tokio::test]
	async fn test_regex_sees_whole_data_point() {
		let call = LegacyCall::new("Hello World")
			.setting("regex_pattern", "^hello")
			.setting("regex_should_match", true);
		assert_eq!(Engine::default().evaluate("auto_regex_test", &call).await, Outcome::Bool(true));
	}

	#[tokio::test]
	async fn test_json_diff_outcomes() {
		let call = LegacyCall::new(r#"{"a":1,"b":3}"#)
			.data("expected", json!({"a": 1, "b": 2}))
			.setting("correct_answer_key", "expected");
		assert_eq!(Engine::default().evaluate("auto_json_diff", &call).await, Outcome::Number(0.5));

		let empty = LegacyCall::new("{}").data("expected", json!({})).setting("correct_answer_key", "expected");
		let outcome = Engine::default().evaluate("auto_json_diff", &empty).await;
		assert_eq!(outcome.kind(), OutcomeKind::Error);
	}

	#[tokio::test]
	async fn test_levenshtein_shape_follows_threshold() {
		let base = LegacyCall::new("kitten").data("expected", "sitting").setting("correct_answer_key", "expected");
		let engine = Engine::default();
		assert_eq!(engine.evaluate("auto_levenshtein_distance", &base).await, Outcome::Number(3.0));

		let strict = base.clone().setting("threshold", 2);
		assert_eq!(engine.evaluate("auto_levenshtein_distance", &strict).await, Outcome::Bool(false));
	}

	#[tokio::test]
	async fn test_starts_with_and_contains_json_are_bool() {
		let engine = Engine::default();
		let call = LegacyCall::new("Hello there").setting("prefix", "Hello");
		assert_eq!(engine.evaluate("auto_starts_with", &call).await, Outcome::Bool(true));

		let call = LegacyCall::new(r#"prefix {"x":1} suffix"#);
		assert_eq!(engine.evaluate("auto_contains_json", &call).await, Outcome::Bool(true));
		let call = LegacyCall::new("no braces here");
		assert_eq!(engine.evaluate("auto_contains_json", &call).await, Outcome::Bool(false));
	}

	#[tokio::test]
	async fn test_custom_code_receives_app_params() {
		let engine = Engine::new(Collaborators::default().with_sandbox(sandbox_fn(|req| {
			assert_eq!(req.app_config, json!({"temperature": 0.3}));
			Ok(0.75)
		})));
		let call = LegacyCall::new("4")
			.data("answer", "4")
			.app_param("temperature", 0.3)
			.setting("correct_answer_key", "answer")
			.setting("code", "return 0.75");
		assert_eq!(engine.evaluate("auto_custom_code_run", &call).await, Outcome::Number(0.75));
	}

	#[tokio::test]
	async fn test_ai_critique_is_text() {
		let engine = Engine::new(Collaborators::default().with_chat(chat_fn(|messages| {
			let ctx: Value = serde_json::from_str(&messages[1].content).unwrap();
			assert_eq!(ctx["llm_app_prompt_template"], json!("Capital of France?"));
			Ok("8".to_string())
		})));
		let call = LegacyCall::new("Paris")
			.data("answer", "Paris")
			.app_param("prompt_user", "Capital of France?")
			.setting("correct_answer_key", "answer")
			.setting("prompt_template", "Grade it.")
			.credential("OPENAI_API_KEY", "sk-test");
		assert_eq!(engine.evaluate("auto_ai_critique", &call).await, Outcome::Text("8".into()));
	}

	#[tokio::test]
	async fn test_external_failure_has_stacktrace() {
		let engine = Engine::new(Collaborators::default().with_sandbox(sandbox_fn(|_| anyhow::bail!("boom"))));
		let call = LegacyCall::new("4")
			.data("answer", "4")
			.setting("correct_answer_key", "answer")
			.setting("code", "raise");
		let outcome = engine.evaluate("auto_custom_code_run", &call).await;
		let details = outcome.error_details().unwrap();
		assert!(details.message.starts_with("Error during Custom Code evaluation"));
		assert!(details.stacktrace.is_some());
	}

	#[tokio::test]
	async fn test_rag_plain_text_output() {
		let call = LegacyCall::new("just text");
		let outcome = Engine::default().evaluate("rag_faithfulness", &call).await;
		assert!(outcome.error_details().unwrap().message.contains("update the SDK"));
	}

	#[test]
	fn test_evaluate_blocking() {
		let runtime = tokio::runtime::Runtime::new().unwrap();
		let call = LegacyCall::new("the cat sat")
			.data("expected", "the cat ran")
			.setting("correct_answer_key", "expected")
			.setting("similarity_threshold", 0.4);
		let outcome = Engine::default().evaluate_blocking(&runtime, "auto_similarity_match", &call);
		assert_eq!(outcome, Outcome::Bool(true));
	}
}
