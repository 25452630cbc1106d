//! RAG metrics over values pulled out of the app's trace tree.

use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};
use serde_json::Value;
use tracing::error;

use crate::collaborators::{Collaborators, RagMetric, RagSample};
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::settings::{openai_api_key, required_input, Settings};
use crate::trace::get_trace_value;

const KEY_SETTINGS: [(&str, &str); 3] = [
    ("question_key", "question"),
    ("answer_key", "answer"),
    ("contexts_key", "contexts"),
];

/// Faithfulness or context relevancy of a RAG answer.
///
/// The prediction must be the app's structured response carrying a `trace`.
pub struct RagEvaluator {
    metric: RagMetric,
}

impl RagEvaluator {
    pub const fn new(metric: RagMetric) -> Self {
        Self { metric }
    }
}

#[async_trait]
impl Evaluator for RagEvaluator {
    fn name(&self) -> &'static str {
        match self.metric {
            RagMetric::Faithfulness => "rag_faithfulness",
            RagMetric::ContextRelevancy => "rag_context_relevancy",
        }
    }

    async fn evaluate(&self, input: &EvaluatorInput, services: &Collaborators) -> Result<EvaluatorOutput> {
        let output = required_input(&input.inputs, "prediction")?;
        let raw_trace = match output {
            Value::String(_) => {
                error!(evaluator = self.name(), "output is plain text, not a structured response");
                return Err(EvalError::configuration(
                    "The app output is plain text. Please update the SDK to the latest version, which supports RAG evaluators.",
                ));
            }
            other => other
                .get("trace")
                .ok_or_else(|| EvalError::configuration("The app output carries no 'trace' field."))?,
        };

        let paths = trace_keys(&Settings::new(&input.settings))?;
        let tree = match &services.traces {
            Some(assembler) => assembler
                .assemble(raw_trace)
                .map_err(|e| EvalError::from_collaborator("trace assembly", e))?,
            None => raw_trace.clone(),
        };

        let resolved: Vec<Option<&Value>> = paths.iter().map(|p| get_trace_value(&tree, p)).collect();
        if resolved.iter().any(Option::is_none) {
            let mut message = String::new();
            for ((setting, _), (path, value)) in KEY_SETTINGS.iter().zip(paths.iter().zip(&resolved)) {
                if value.is_none() {
                    message.push_str(&format!("'{setting}' is set to {path} which can't be found. "));
                }
            }
            message.push_str("Please check your evaluator settings and try again.");
            error!(evaluator = self.name(), %message, "trace fields missing");
            return Err(EvalError::configuration(message));
        }

        let api_key = openai_api_key(&input.credentials)?;
        let scorer = services
            .rag
            .as_ref()
            .ok_or_else(|| EvalError::configuration("No RAG metric provider is configured."))?;

        let sample = RagSample {
            question: resolved[0].cloned().unwrap_or_default(),
            answer: resolved[1].cloned().unwrap_or_default(),
            contexts: resolved[2].cloned().unwrap_or_default(),
        };
        let score = scorer
            .score(self.metric, api_key, sample)
            .await
            .map_err(|e| EvalError::from_collaborator(self.name(), e))?;
        Ok(EvaluatorOutput::score(score))
    }
}

fn trace_keys<'a>(settings: &Settings<'a>) -> Result<Vec<&'a str>> {
    let keys: Vec<Option<&str>> = KEY_SETTINGS
        .iter()
        .map(|(setting, _)| settings.optional_str(setting))
        .collect::<Result<_>>()?;
    if keys.iter().any(Option::is_none) {
        let missing: Vec<&str> = KEY_SETTINGS
            .iter()
            .zip(&keys)
            .filter(|(_, k)| k.is_none())
            .map(|((_, label), _)| *label)
            .collect();
        error!(missing = ?missing, "RAG evaluator settings incomplete");
        return Err(EvalError::configuration(
            "Missing required configuration keys: 'question_key', 'answer_key', or 'contexts_key'. Please check your evaluator settings and try again.",
        ));
    }
    Ok(keys.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assembler_fn, rag_fn};
    use serde_json::json;

    fn trace() -> Value {
        json!({
            "spans": {
                "rag": {
                    "spans": {
                        "retriever": {"outputs": {"contexts": ["Paris is in France."]}}
                    },
                    "inputs": {"question": "Where is Paris?"},
                    "outputs": {"answer": "France"}
                }
            }
        })
    }

    fn input() -> EvaluatorInput {
        EvaluatorInput::new()
            .input("prediction", json!({"data": "France", "trace": trace()}))
            .setting("question_key", "rag.inputs.question")
            .setting("answer_key", "rag.outputs.answer")
            .setting("contexts_key", "rag.retriever.outputs.contexts")
            .credential("OPENAI_API_KEY", "sk-test")
    }

    fn services() -> Collaborators {
        Collaborators::default().with_rag(rag_fn(|metric, sample| {
            assert_eq!(sample.question, json!("Where is Paris?"));
            assert_eq!(sample.answer, json!("France"));
            assert_eq!(sample.contexts, json!(["Paris is in France."]));
            Ok(match metric {
                RagMetric::Faithfulness => 0.9,
                RagMetric::ContextRelevancy => 0.4,
            })
        }))
    }

    #[tokio::test]
    async fn test_faithfulness_score() {
        let out = RagEvaluator::new(RagMetric::Faithfulness)
            .evaluate(&input(), &services())
            .await
            .unwrap();
        assert_eq!(out.score_value(), Some(&json!(0.9)));
    }

    #[tokio::test]
    async fn test_context_relevancy_uses_assembler() {
        let services = services().with_traces(assembler_fn(|raw| Ok(raw["wrapped"].clone())));
        let mut input = input();
        input
            .inputs
            .insert("prediction".into(), json!({"trace": {"wrapped": trace()}}));
        let out = RagEvaluator::new(RagMetric::ContextRelevancy)
            .evaluate(&input, &services)
            .await
            .unwrap();
        assert_eq!(out.score_value(), Some(&json!(0.4)));
    }

    #[tokio::test]
    async fn test_plain_text_output_rejected() {
        let mut input = input();
        input.inputs.insert("prediction".into(), json!("France"));
        let err = RagEvaluator::new(RagMetric::Faithfulness)
            .evaluate(&input, &services())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("update the SDK"));
    }

    #[tokio::test]
    async fn test_missing_settings() {
        let mut input = input();
        input.settings.remove("contexts_key");
        let err = RagEvaluator::new(RagMetric::Faithfulness)
            .evaluate(&input, &services())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing required configuration keys"));
    }

    #[tokio::test]
    async fn test_unresolved_trace_keys_are_listed() {
        let mut input = input();
        input.settings.insert("answer_key".into(), json!("rag.outputs.nope"));
        let err = RagEvaluator::new(RagMetric::Faithfulness)
            .evaluate(&input, &services())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(err.is_configuration());
        assert!(msg.contains("'answer_key' is set to rag.outputs.nope which can't be found."));
        assert!(!msg.contains("question_key"));
    }

    #[tokio::test]
    async fn test_empty_key_is_not_the_whole_trace() {
        let mut input = input();
        input.settings.insert("question_key".into(), json!(""));
        let err = RagEvaluator::new(RagMetric::Faithfulness)
            .evaluate(&input, &services())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("'question_key' is set to  which can't be found."));
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let mut input = input();
        input.credentials.clear();
        let err = RagEvaluator::new(RagMetric::Faithfulness)
            .evaluate(&input, &services())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OpenAI"));
    }
}
