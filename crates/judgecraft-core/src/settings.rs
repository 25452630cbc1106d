//! Typed reads over the free-form settings, inputs and credentials maps.

use judgecraft_types::JsonMap;
use serde_json::Value;

use crate::error::{EvalError, Result};

/// Borrowed view over a settings-like JSON object.
#[derive(Debug, Clone, Copy)]
pub struct Settings<'a> {
    map: &'a JsonMap,
}

impl<'a> Settings<'a> {
    pub fn new(map: &'a JsonMap) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn required(&self, key: &str) -> Result<&'a Value> {
        self.get(key).ok_or_else(|| EvalError::missing_setting(key))
    }

    pub fn required_str(&self, key: &str) -> Result<&'a str> {
        self.required(key)?
            .as_str()
            .ok_or_else(|| EvalError::configuration(format!("Setting '{key}' must be a string.")))
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| EvalError::configuration(format!("Setting '{key}' must be a string."))),
        }
    }

    pub fn str_or(&self, key: &str, default: &'a str) -> Result<&'a str> {
        Ok(self.optional_str(key)?.unwrap_or(default))
    }

    pub fn required_bool(&self, key: &str) -> Result<bool> {
        as_bool(key, self.required(key)?)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        self.get(key).map_or(Ok(default), |v| as_bool(key, v))
    }

    pub fn required_f64(&self, key: &str) -> Result<f64> {
        as_f64(key, self.required(key)?)
    }

    pub fn optional_f64(&self, key: &str) -> Result<Option<f64>> {
        self.get(key).map(|v| as_f64(key, v)).transpose()
    }
}

// Settings arriving from web forms sometimes carry "true"/"0.5" as strings.
fn as_bool(key: &str, v: &Value) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(EvalError::configuration(format!("Setting '{key}' must be a boolean."))),
    }
}

fn as_f64(key: &str, v: &Value) -> Result<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| EvalError::configuration(format!("Setting '{key}' must be a number.")))
}

/// Render a JSON value as evaluator text: strings verbatim, null as empty, else JSON.
pub fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        _ => v.to_string(),
    }
}

/// Fetch a required entry of `inputs` as text.
pub fn required_text(inputs: &JsonMap, key: &str) -> Result<String> {
    inputs
        .get(key)
        .map(stringify)
        .ok_or_else(|| EvalError::configuration(format!("Missing required input '{key}'.")))
}

/// Fetch a required entry of `inputs` as a JSON value.
pub fn required_input<'a>(inputs: &'a JsonMap, key: &str) -> Result<&'a Value> {
    inputs
        .get(key)
        .ok_or_else(|| EvalError::configuration(format!("Missing required input '{key}'.")))
}

/// Credential name of the LLM provider key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// The provider key from the per-call credentials; empty counts as missing.
pub fn openai_api_key(credentials: &JsonMap) -> Result<&str> {
    credentials
        .get(OPENAI_API_KEY)
        .and_then(Value::as_str)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            EvalError::configuration("No OpenAI API key found. Please configure your OpenAI keys and try again.")
        })
}
