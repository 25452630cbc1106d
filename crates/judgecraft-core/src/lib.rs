//! judgecraft-core: evaluator execution engine.
//! Resolve fields out of nested outputs and trace trees, score them with one of
//! the registered evaluators, and get back a uniform result.
//! See `examples/simple.rs` for a quickstart.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod legacy;
pub mod path;
pub mod registry;
pub mod settings;
pub mod testing;
pub mod trace;

pub mod evaluators {
    pub mod code;
    pub mod contains;
    pub mod critique;
    pub mod embedding;
    pub mod exact;
    pub mod json;
    pub mod levenshtein;
    pub mod rag;
    pub mod regex;
    pub mod similarity;
    pub mod webhook;
}

pub use collaborators::{
    ChatClient, ChatMessage, CodeRequest, CodeSandbox, Collaborators, EmbeddingClient, OpenAiClient, RagMetric,
    RagSample, RagScorer, TraceAssembler,
};
pub use config::EngineConfig;
pub use error::{EvalError, Result};
pub use evaluator::Evaluator;
pub use legacy::LegacyCall;
pub use path::{get_nested, map_fields};
pub use registry::{Engine, EvaluatorKind, ResultShape};
pub use trace::get_trace_value;

pub use judgecraft_types::{
    summary_table, EvaluationRecord, EvaluatorInput, EvaluatorOutput, JsonMap, MappingInput, MappingOutput, Outcome,
    OutcomeKind,
};
