use std::collections::HashSet;

use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};

use crate::collaborators::Collaborators;
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::settings::{required_text, Settings};

/// Jaccard similarity of whitespace-separated word sets.
///
/// Succeeds when the similarity is strictly above `similarity_threshold`.
pub struct SimilarityMatch;

#[async_trait]
impl Evaluator for SimilarityMatch {
    fn name(&self) -> &'static str {
        "similarity_match"
    }

    async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
        let threshold = Settings::new(&input.settings).required_f64("similarity_threshold")?;
        let prediction = required_text(&input.inputs, "prediction")?;
        let ground_truth = required_text(&input.inputs, "ground_truth")?;

        let similarity = jaccard(&prediction, &ground_truth)?;
        Ok(EvaluatorOutput::success(similarity > threshold).with("similarity", similarity))
    }
}

/// |A ∩ B| / |A ∪ B| over word sets. Two texts without words have no
/// similarity and are an error.
pub fn jaccard(a: &str, b: &str) -> Result<f64> {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return Err(EvalError::configuration(
            "Similarity match has no words to compare: prediction and ground truth are both empty.",
        ));
    }
    Ok(a.intersection(&b).count() as f64 / union as f64)
}
