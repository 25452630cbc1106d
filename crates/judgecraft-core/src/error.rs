//! Evaluator errors and their conversion into error outcomes.

use std::error::Error as StdError;

use judgecraft_types::Outcome;
use thiserror::Error;

/// Errors raised by evaluators and the dispatcher.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Missing or invalid settings / data-point fields. User-fixable.
    #[error("{0}")]
    Configuration(String),

    /// The registry has no evaluator under this key.
    #[error("Evaluator {0} not found")]
    UnknownEvaluator(String),

    /// An external collaborator (webhook, sandbox, LLM, RAG metric) failed.
    #[error("[{context}] {message}")]
    External {
        /// Which collaborator call failed.
        context: String,
        /// Error message.
        message: String,
    },

    /// JSON error.
    #[error("JSON - {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP - {0}")]
    Http(#[from] reqwest::Error),

    /// Other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EvalError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn external(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::External {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Wrap a host collaborator failure, keeping its cause chain in the message.
    pub fn from_collaborator(context: impl Into<String>, err: anyhow::Error) -> Self {
        Self::External {
            context: context.into(),
            message: format!("{err:#}"),
        }
    }

    pub fn missing_setting(key: &str) -> Self {
        Self::Configuration(format!("Missing required setting '{key}'."))
    }

    /// True for errors the user fixes by changing configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::UnknownEvaluator(_))
    }

    /// Convert into an error outcome. Configuration problems carry no stacktrace.
    pub fn into_outcome(self, label: &str) -> Outcome {
        if self.is_configuration() {
            return Outcome::error(self.to_string());
        }
        let message = format!("Error during {label} evaluation: {self}");
        Outcome::error_with_trace(message, error_chain(&self))
    }
}

/// Result type for evaluator operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Debug rendering of an error followed by its `source()` chain.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = format!("{err:?}");
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\nCaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
