use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};

use crate::collaborators::Collaborators;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::settings::{required_text, Settings};

/// Edit distance between prediction and ground truth.
///
/// Without a `threshold` setting the output is `{"score": distance}`; with one
/// it is `{"success": distance <= threshold}`.
pub struct LevenshteinDistance;

#[async_trait]
impl Evaluator for LevenshteinDistance {
    fn name(&self) -> &'static str {
        "levenshtein_distance"
    }

    async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
        let prediction = required_text(&input.inputs, "prediction")?;
        let ground_truth = required_text(&input.inputs, "ground_truth")?;
        let distance = levenshtein(&prediction, &ground_truth);

        match Settings::new(&input.settings).optional_f64("threshold")? {
            Some(threshold) => Ok(EvaluatorOutput::success(distance as f64 <= threshold)),
            None => Ok(EvaluatorOutput::score(distance as u64)),
        }
    }
}

/// Unit-cost edit distance over chars, using two rows sized by the shorter string.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    if inner.is_empty() {
        return outer.len();
    }

    let mut previous: Vec<usize> = (0..=inner.len()).collect();
    let mut current = vec![0usize; inner.len() + 1];

    for (i, c1) in outer.iter().enumerate() {
        current[0] = i + 1;
        for (j, c2) in inner.iter().enumerate() {
            let insertion = previous[j + 1] + 1;
            let deletion = current[j] + 1;
            let substitution = previous[j] + usize::from(c1 != c2);
            current[j + 1] = insertion.min(deletion).min(substitution);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[inner.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_classic_pairs() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn test_symmetric_and_matches_reference() {
        let words = ["", "a", "kitten", "sitting", "saturday", "sunday", "héllo", "hello", "résumé"];
        for a in words {
            for b in words {
                assert_eq!(levenshtein(a, b), levenshtein(b, a), "{a:?} vs {b:?}");
                assert_eq!(levenshtein(a, b), strsim::levenshtein(a, b), "{a:?} vs {b:?}");
            }
        }
    }

    #[tokio::test]
    async fn test_score_without_threshold() {
        let input = EvaluatorInput::new()
            .input("prediction", "kitten")
            .input("ground_truth", "sitting");
        let out = LevenshteinDistance.evaluate(&input, &Collaborators::default()).await.unwrap();
        assert_eq!(out.score_value(), Some(&json!(3)));
        assert_eq!(out.success_flag(), None);
    }

    #[tokio::test]
    async fn test_threshold_yields_success() {
        let base = EvaluatorInput::new()
            .input("prediction", "kitten")
            .input("ground_truth", "sitting");

        let within = base.clone().setting("threshold", 3);
        let out = LevenshteinDistance.evaluate(&within, &Collaborators::default()).await.unwrap();
        assert_eq!(out.success_flag(), Some(true));

        let beyond = base.setting("threshold", 2);
        let out = LevenshteinDistance.evaluate(&beyond, &Collaborators::default()).await.unwrap();
        assert_eq!(out.success_flag(), Some(false));
        assert_eq!(out.score_value(), None::<&Value>);
    }
}
