use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};
use serde_json::{json, Value};
use tracing::debug;

use crate::collaborators::Collaborators;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::settings::{required_input, Settings};

/// Delegates scoring to a user-owned HTTP endpoint.
///
/// POSTs `{correct_answer, output, inputs}` to `webhook_url` and reads the
/// `score` field of the JSON reply (`null` when absent).
pub struct WebhookTest;

#[async_trait]
impl Evaluator for WebhookTest {
    fn name(&self) -> &'static str {
        "webhook_test"
    }

    async fn evaluate(&self, input: &EvaluatorInput, services: &Collaborators) -> Result<EvaluatorOutput> {
        let url = Settings::new(&input.settings).required_str("webhook_url")?;
        let payload = json!({
            "correct_answer": required_input(&input.inputs, "ground_truth")?,
            "output": required_input(&input.inputs, "prediction")?,
            "inputs": input.inputs,
        });

        debug!(url, "calling evaluation webhook");
        let resp = services
            .http
            .post(url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let body = resp.bytes().await?;
        let data: Value = serde_json::from_slice(&body)?;

        let score = data.get("score").cloned().unwrap_or(Value::Null);
        Ok(EvaluatorOutput::score(score))
    }
}
