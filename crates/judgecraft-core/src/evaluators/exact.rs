use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};
use serde_json::Value;
use tracing::debug;

use crate::collaborators::Collaborators;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::settings::required_input;

/// Literal, type-sensitive equality of prediction and ground truth.
pub struct ExactMatch;

#[async_trait]
impl Evaluator for ExactMatch {
	fn name(&self) -> &'static str {
		"exact_match"
	}

	async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
		let empty = Value::String(String::new());
		let prediction = input.prediction().unwrap_or(&empty);
		let ground_truth = input.ground_truth().unwrap_or(&empty);
		Ok(EvaluatorOutput::success(prediction == ground_truth))
	}
}

/// Parses the prediction as JSON and compares it structurally to the ground truth.
///
/// A prediction that is not valid JSON does not match.
pub struct FieldMatch;

#[async_trait]
impl Evaluator for FieldMatch {
	fn name(&self) -> &'static str {
		"field_match_test"
	}

	async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
		let prediction = required_input(&input.inputs, "prediction")?;
		let ground_truth = required_input(&input.inputs, "ground_truth")?;

		let matched = match prediction {
			Value::String(text) => match serde_json::from_str::<Value>(text) {
				Ok(parsed) => &parsed == ground_truth,
				Err(err) => {
					debug!(error = %err, "field match prediction is not valid JSON");
					false
				}
			},
			structured => structured == ground_truth,
		};
		Ok(EvaluatorOutput::success(matched))
	}
}
