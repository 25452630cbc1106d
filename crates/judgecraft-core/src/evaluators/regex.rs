use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};
use regex::RegexBuilder;

use crate::collaborators::Collaborators;
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::settings::{required_text, Settings};

/// Case-insensitive pattern search over the prediction.
///
/// Succeeds when "pattern found" equals the `regex_should_match` setting.
pub struct RegexTest;

#[async_trait]
impl Evaluator for RegexTest {
	fn name(&self) -> &'static str {
		"regex_test"
	}

	async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
		let settings = Settings::new(&input.settings);
		let pattern_str = settings.required_str("regex_pattern")?;
		let should_match = settings.required_bool("regex_should_match")?;

		let pattern = RegexBuilder::new(pattern_str)
			.case_insensitive(true)
			.build()
			.map_err(|e| EvalError::configuration(format!("Invalid regex pattern '{pattern_str}': {e}")))?;

		let prediction = required_text(&input.inputs, "prediction")?;
		let found = pattern.is_match(&prediction);
		Ok(EvaluatorOutput::success(found == should_match))
	}
}
