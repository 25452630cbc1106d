use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};
use serde_json::json;

use crate::collaborators::{CodeRequest, Collaborators};
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::settings::{required_input, Settings};

/// Runs the `code` setting in the host's sandbox and reports its numeric score.
pub struct CustomCodeRun;

#[async_trait]
impl Evaluator for CustomCodeRun {
    fn name(&self) -> &'static str {
        "custom_code_run"
    }

    async fn evaluate(&self, input: &EvaluatorInput, services: &Collaborators) -> Result<EvaluatorOutput> {
        let code = Settings::new(&input.settings).required_str("code")?;
        let sandbox = services
            .sandbox
            .as_ref()
            .ok_or_else(|| EvalError::configuration("No code sandbox is configured."))?;

        let ground_truth = required_input(&input.inputs, "ground_truth")?.clone();
        let request = CodeRequest {
            app_config: input.inputs.get("app_config").cloned().unwrap_or_else(|| json!({})),
            inputs: input.inputs.clone(),
            output: required_input(&input.inputs, "prediction")?.clone(),
            datapoint: input.inputs.get("datapoint").cloned().unwrap_or_else(|| ground_truth.clone()),
            ground_truth,
            code: code.to_string(),
        };

        let score = sandbox
            .execute(request)
            .await
            .map_err(|e| EvalError::from_collaborator("custom code", e))?;
        if !score.is_finite() {
            return Err(EvalError::external("custom code", format!("sandbox returned a non-finite score ({score})")));
        }
        Ok(EvaluatorOutput::score(score))
    }
}
