use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};
use tracing::debug;

use crate::collaborators::{Collaborators, RagMetric};
use crate::config::EngineConfig;
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::evaluators::{
	code::CustomCodeRun,
	contains::{Contains, ContainsAll, ContainsAny, ContainsJson, EndsWith, StartsWith},
	critique::AiCritique,
	embedding::SemanticSimilarity,
	exact::{ExactMatch, FieldMatch},
	json::JsonDiff,
	levenshtein::LevenshteinDistance,
	rag::RagEvaluator,
	regex::RegexTest,
	similarity::SimilarityMatch,
	webhook::WebhookTest,
};

static FAITHFULNESS: RagEvaluator = RagEvaluator::new(RagMetric::Faithfulness);
static CONTEXT_RELEVANCY: RagEvaluator = RagEvaluator::new(RagMetric::ContextRelevancy);

/// Every evaluator the engine knows, keyed by a stable string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluatorKind {
	ExactMatch,
	RegexTest,
	FieldMatch,
	WebhookTest,
	CustomCodeRun,
	AiCritique,
	StartsWith,
	EndsWith,
	Contains,
	ContainsAny,
	ContainsAll,
	ContainsJson,
	JsonDiff,
	SemanticSimilarity,
	LevenshteinDistance,
	SimilarityMatch,
	RagFaithfulness,
	RagContextRelevancy,
}

/// How a legacy caller expects the evaluator output to be typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
	Bool,
	Number,
	Text,
	/// `success` when present, otherwise `score`.
	Auto,
}

impl EvaluatorKind {
	pub const ALL: [EvaluatorKind; 18] = [
		Self::ExactMatch,
		Self::RegexTest,
		Self::FieldMatch,
		Self::WebhookTest,
		Self::CustomCodeRun,
		Self::AiCritique,
		Self::StartsWith,
		Self::EndsWith,
		Self::Contains,
		Self::ContainsAny,
		Self::ContainsAll,
		Self::ContainsJson,
		Self::JsonDiff,
		Self::SemanticSimilarity,
		Self::LevenshteinDistance,
		Self::SimilarityMatch,
		Self::RagFaithfulness,
		Self::RagContextRelevancy,
	];

	/// Resolve a registry key. Field match answers to both its legacy
	/// (`field_match_test`) and current (`auto_field_match_test`) spelling.
	pub fn from_key(key: &str) -> Option<Self> {
		let kind = match key {
			"auto_exact_match" => Self::ExactMatch,
			"auto_regex_test" => Self::RegexTest,
			"field_match_test" | "auto_field_match_test" => Self::FieldMatch,
			"auto_webhook_test" => Self::WebhookTest,
			"auto_custom_code_run" => Self::CustomCodeRun,
			"auto_ai_critique" => Self::AiCritique,
			"auto_starts_with" => Self::StartsWith,
			"auto_ends_with" => Self::EndsWith,
			"auto_contains" => Self::Contains,
			"auto_contains_any" => Self::ContainsAny,
			"auto_contains_all" => Self::ContainsAll,
			"auto_contains_json" => Self::ContainsJson,
			"auto_json_diff" => Self::JsonDiff,
			"auto_semantic_similarity" => Self::SemanticSimilarity,
			"auto_levenshtein_distance" => Self::LevenshteinDistance,
			"auto_similarity_match" => Self::SimilarityMatch,
			"rag_faithfulness" => Self::RagFaithfulness,
			"rag_context_relevancy" => Self::RagContextRelevancy,
			_ => return None,
		};
		Some(kind)
	}

	pub fn key(self) -> &'static str {
		match self {
			Self::ExactMatch => "auto_exact_match",
			Self::RegexTest => "auto_regex_test",
			Self::FieldMatch => "field_match_test",
			Self::WebhookTest => "auto_webhook_test",
			Self::CustomCodeRun => "auto_custom_code_run",
			Self::AiCritique => "auto_ai_critique",
			Self::StartsWith => "auto_starts_with",
			Self::EndsWith => "auto_ends_with",
			Self::Contains => "auto_contains",
			Self::ContainsAny => "auto_contains_any",
			Self::ContainsAll => "auto_contains_all",
			Self::ContainsJson => "auto_contains_json",
			Self::JsonDiff => "auto_json_diff",
			Self::SemanticSimilarity => "auto_semantic_similarity",
			Self::LevenshteinDistance => "auto_levenshtein_distance",
			Self::SimilarityMatch => "auto_similarity_match",
			Self::RagFaithfulness => "rag_faithfulness",
			Self::RagContextRelevancy => "rag_context_relevancy",
		}
	}

	/// Human-readable name used in error messages.
	pub fn label(self) -> &'static str {
		match self {
			Self::ExactMatch => "Exact Match",
			Self::RegexTest => "Regex Test",
			Self::FieldMatch => "Field Match",
			Self::WebhookTest => "Webhook Test",
			Self::CustomCodeRun => "Custom Code",
			Self::AiCritique => "AI Critique",
			Self::StartsWith => "Starts With",
			Self::EndsWith => "Ends With",
			Self::Contains => "Contains",
			Self::ContainsAny => "Contains Any",
			Self::ContainsAll => "Contains All",
			Self::ContainsJson => "Contains JSON",
			Self::JsonDiff => "JSON Diff",
			Self::SemanticSimilarity => "Semantic Similarity",
			Self::LevenshteinDistance => "Levenshtein Distance",
			Self::SimilarityMatch => "Similarity Match",
			Self::RagFaithfulness => "RAG Faithfulness",
			Self::RagContextRelevancy => "RAG Context Relevancy",
		}
	}

	pub fn evaluator(self) -> &'static dyn Evaluator {
		match self {
			Self::ExactMatch => &ExactMatch,
			Self::RegexTest => &RegexTest,
			Self::FieldMatch => &FieldMatch,
			Self::WebhookTest => &WebhookTest,
			Self::CustomCodeRun => &CustomCodeRun,
			Self::AiCritique => &AiCritique,
			Self::StartsWith => &StartsWith,
			Self::EndsWith => &EndsWith,
			Self::Contains => &Contains,
			Self::ContainsAny => &ContainsAny,
			Self::ContainsAll => &ContainsAll,
			Self::ContainsJson => &ContainsJson,
			Self::JsonDiff => &JsonDiff,
			Self::SemanticSimilarity => &SemanticSimilarity,
			Self::LevenshteinDistance => &LevenshteinDistance,
			Self::SimilarityMatch => &SimilarityMatch,
			Self::RagFaithfulness => &FAITHFULNESS,
			Self::RagContextRelevancy => &CONTEXT_RELEVANCY,
		}
	}

	pub fn result_shape(self) -> ResultShape {
		match self {
			Self::WebhookTest
			| Self::CustomCodeRun
			| Self::JsonDiff
			| Self::SemanticSimilarity
			| Self::RagFaithfulness
			| Self::RagContextRelevancy => ResultShape::Number,
			Self::AiCritique => ResultShape::Text,
			Self::LevenshteinDistance => ResultShape::Auto,
			_ => ResultShape::Bool,
		}
	}
}

/// Dispatches evaluator calls against a fixed set of collaborators.
///
/// The engine holds no per-call state; clones share the same collaborators
/// and can run concurrently.
#[derive(Clone, Default)]
pub struct Engine {
	services: Collaborators,
}

impl Engine {
	pub fn new(services: Collaborators) -> Self {
		Self { services }
	}

	pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
		Ok(Self::new(Collaborators::from_config(config)?))
	}

	pub fn services(&self) -> &Collaborators {
		&self.services
	}

	/// Run one evaluator by key and return its raw output.
	pub async fn run(&self, key: &str, input: &EvaluatorInput) -> Result<EvaluatorOutput> {
		let kind = EvaluatorKind::from_key(key).ok_or_else(|| EvalError::UnknownEvaluator(key.to_string()))?;
		self.dispatch(kind, input).await
	}

	pub(crate) async fn dispatch(&self, kind: EvaluatorKind, input: &EvaluatorInput) -> Result<EvaluatorOutput> {
		let evaluator = kind.evaluator();
		debug!(evaluator = kind.key(), "running evaluator");
		match AssertUnwindSafe(evaluator.evaluate(input, &self.services)).catch_unwind().await {
			Ok(result) => result,
			Err(panic) => Err(EvalError::external(
				evaluator.name(),
				format!("evaluator panicked: {}", panic_message(panic.as_ref())),
			)),
		}
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
	if let Some(s) = panic.downcast_ref::<&str>() {
		s
	} else if let Some(s) = panic.downcast_ref::<String>() {
		s
	} else {
		"unknown panic"
	}
}
