use std::path::Path;

use anyhow::{anyhow, Context, Result};
use judgecraft_core::LegacyCall;
use serde::Deserialize;
use serde_json::Value;

/// One line of a requests file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluationRequest {
	#[serde(default)]
	pub id: Option<String>,
	pub evaluator: String,
	#[serde(flatten)]
	pub call: LegacyCall,
}

/// Read JSONL where each line is
/// `{"id"?, "evaluator", "output", "inputs"?, "data_point"?, "app_params"?, "settings"?, "credentials"?}`.
pub async fn load_requests(path: &Path) -> Result<Vec<EvaluationRequest>> {
	let content = tokio::fs::read_to_string(path)
		.await
		.with_context(|| format!("Failed to read {:?}", path))?;
	parse_requests(&content)
}

pub fn parse_requests(content: &str) -> Result<Vec<EvaluationRequest>> {
	let mut requests = Vec::new();
	for (idx, line) in content.lines().enumerate() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		let value: Value = serde_json::from_str(line)
			.with_context(|| format!("Invalid JSON on line {}", idx + 1))?;
		if !value.is_object() {
			return Err(anyhow!("Line {}: expected object", idx + 1));
		}
		let request: EvaluationRequest = serde_json::from_value(value)
			.with_context(|| format!("Line {}: malformed request", idx + 1))?;
		requests.push(request);
	}
	Ok(requests)
}
