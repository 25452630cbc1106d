use async_trait::async_trait;
use judgecraft_types::{EvaluatorInput, EvaluatorOutput};
use serde_json::Value;

use crate::collaborators::Collaborators;
use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::settings::{required_text, Settings};

/// Prediction text and needles, lowercased together unless `case_sensitive` (default true).
fn folded_all(input: &EvaluatorInput, needles: &[String]) -> Result<(String, Vec<String>)> {
    let prediction = required_text(&input.inputs, "prediction")?;
    let case_sensitive = Settings::new(&input.settings).bool_or("case_sensitive", true)?;
    if case_sensitive {
        Ok((prediction, needles.to_vec()))
    } else {
        let needles = needles.iter().map(|n| n.to_lowercase()).collect();
        Ok((prediction.to_lowercase(), needles))
    }
}

fn folded(input: &EvaluatorInput, needle: &str) -> Result<(String, String)> {
    let (text, mut needles) = folded_all(input, &[needle.to_string()])?;
    Ok((text, needles.remove(0)))
}

/// Comma-separated `substrings` setting, trimmed, empty entries dropped.
///
/// Unlike `prefix`/`suffix`/`substring`, the setting has no `""` default: an
/// empty needle list would make `contains_any` and `contains_all` pass on any
/// text, so a missing or blank list is a configuration error.
fn substrings(input: &EvaluatorInput) -> Result<Vec<String>> {
    let raw = Settings::new(&input.settings).required_str("substrings")?;
    let list: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if list.is_empty() {
        return Err(EvalError::configuration(
            "Setting 'substrings' must list at least one comma-separated substring.",
        ));
    }
    Ok(list)
}

/// Checks if the prediction starts with the `prefix` setting.
pub struct StartsWith;

#[async_trait]
impl Evaluator for StartsWith {
    fn name(&self) -> &'static str {
        "starts_with"
    }

    async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
        let prefix = Settings::new(&input.settings).str_or("prefix", "")?;
        let (text, prefix) = folded(input, prefix)?;
        Ok(EvaluatorOutput::success(text.starts_with(&prefix)))
    }
}

/// Checks if the prediction ends with the `suffix` setting.
pub struct EndsWith;

#[async_trait]
impl Evaluator for EndsWith {
    fn name(&self) -> &'static str {
        "ends_with"
    }

    async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
        let suffix = Settings::new(&input.settings).str_or("suffix", "")?;
        let (text, suffix) = folded(input, suffix)?;
        Ok(EvaluatorOutput::success(text.ends_with(&suffix)))
    }
}

/// Checks if the prediction contains the `substring` setting.
pub struct Contains;

#[async_trait]
impl Evaluator for Contains {
    fn name(&self) -> &'static str {
        "contains"
    }

    async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
        let substring = Settings::new(&input.settings).str_or("substring", "")?;
        let (text, substring) = folded(input, substring)?;
        Ok(EvaluatorOutput::success(text.contains(&substring)))
    }
}

/// Succeeds when at least one of the listed substrings occurs.
pub struct ContainsAny;

#[async_trait]
impl Evaluator for ContainsAny {
    fn name(&self) -> &'static str {
        "contains_any"
    }

    async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
        let needles = substrings(input)?;
        let (text, needles) = folded_all(input, &needles)?;
        Ok(EvaluatorOutput::success(needles.iter().any(|n| text.contains(n.as_str()))))
    }
}

/// Succeeds when every listed substring occurs.
pub struct ContainsAll;

#[async_trait]
impl Evaluator for ContainsAll {
    fn name(&self) -> &'static str {
        "contains_all"
    }

    async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
        let needles = substrings(input)?;
        let (text, needles) = folded_all(input, &needles)?;
        Ok(EvaluatorOutput::success(needles.iter().all(|n| text.contains(n.as_str()))))
    }
}

/// Succeeds when the span from the first `{` to the last `}` parses as JSON.
pub struct ContainsJson;

#[async_trait]
impl Evaluator for ContainsJson {
    fn name(&self) -> &'static str {
        "contains_json"
    }

    async fn evaluate(&self, input: &EvaluatorInput, _services: &Collaborators) -> Result<EvaluatorOutput> {
        let text = required_text(&input.inputs, "prediction")?;
        Ok(EvaluatorOutput::success(contains_json(&text)))
    }
}

pub fn contains_json(text: &str) -> bool {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return false;
    };
    if end < start {
        return false;
    }
    serde_json::from_str::<Value>(&text[start..=end]).is_ok()
}
