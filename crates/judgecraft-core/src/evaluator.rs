use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};

use crate::collaborators::Collaborators;
use crate::error::Result;

/// A scoring strategy. Pure evaluators ignore `services`; the others make
/// exactly one round trip through the collaborator they need.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn evaluate(&self, input: &EvaluatorInput, services: &Collaborators) -> Result<EvaluatorOutput>;
}
