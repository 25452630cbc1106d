use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};

use crate::collaborators::Collaborators;
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::settings::{openai_api_key, required_text};

/// Cosine similarity of prediction and ground-truth embeddings.
///
/// The embedding provider returns unit vectors, so the dot product is the cosine.
pub struct SemanticSimilarity;

#[async_trait]
impl Evaluator for SemanticSimilarity {
    fn name(&self) -> &'static str {
        "semantic_similarity"
    }

    async fn evaluate(&self, input: &EvaluatorInput, services: &Collaborators) -> Result<EvaluatorOutput> {
        let api_key = openai_api_key(&input.credentials)?;
        let embeddings = services
            .embeddings
            .as_ref()
            .ok_or_else(|| EvalError::configuration("No embedding client is configured."))?;

        let prediction = required_text(&input.inputs, "prediction")?;
        let ground_truth = required_text(&input.inputs, "ground_truth")?;

        // The two lookups are independent; issue them together.
        let (p_vec, g_vec) = futures::try_join!(
            embeddings.embed(api_key, &prediction),
            embeddings.embed(api_key, &ground_truth),
        )
        .map_err(|e| EvalError::from_collaborator("embedding", e))?;

        Ok(EvaluatorOutput::score(dot(&p_vec, &g_vec)?))
    }
}

fn dot(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(EvalError::external(
            "embedding",
            format!("vector dimensions differ ({} vs {})", a.len(), b.len()),
        ));
    }
    Ok(a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::embed_fn;
    use serde_json::Value;

    fn input() -> EvaluatorInput {
        EvaluatorInput::new()
            .input("prediction", "cat")
            .input("ground_truth", "kitten")
            .credential("OPENAI_API_KEY", "sk-test")
    }

    fn services() -> Collaborators {
        Collaborators::default().with_embeddings(embed_fn(|text| {
            Ok(match text {
                "cat" => vec![0.6, 0.8],
                _ => vec![1.0, 0.0],
            })
        }))
    }

    #[tokio::test]
    async fn test_dot_product_score() {
        let out = SemanticSimilarity.evaluate(&input(), &services()).await.unwrap();
        let score = out.score_value().and_then(Value::as_f64).unwrap();
        assert!((score - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let mut input = input();
        input.credentials.clear();
        let err = SemanticSimilarity.evaluate(&input, &services()).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_requires_embedding_client() {
        let err = SemanticSimilarity
            .evaluate(&input(), &Collaborators::default())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_provider_failure_is_external() {
        let services = Collaborators::default().with_embeddings(embed_fn(|_| anyhow::bail!("rate limited")));
        let err = SemanticSimilarity.evaluate(&input(), &services).await.unwrap_err();
        assert!(matches!(err, EvalError::External { .. }));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(dot(&[1.0], &[1.0, 0.0]).is_err());
    }
}
