//! Closure-backed collaborators for tests and local wiring.
//!
//! ```ignore
//! let services = Collaborators::default()
//!     .with_embeddings(embed_fn(|text| Ok(vec![text.len() as f32, 1.0])))
//!     .with_sandbox(sandbox_fn(|_req| Ok(0.75)));
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::collaborators::{
    ChatClient, ChatMessage, CodeRequest, CodeSandbox, EmbeddingClient, RagMetric, RagSample, RagScorer,
    TraceAssembler,
};

/// Wrap a closure as a [`CodeSandbox`].
pub fn sandbox_fn<F>(f: F) -> Arc<dyn CodeSandbox>
where
    F: Fn(CodeRequest) -> Result<f64> + Send + Sync + 'static,
{
    struct ClosureSandbox<F>(F);

    #[async_trait]
    impl<F> CodeSandbox for ClosureSandbox<F>
    where
        F: Fn(CodeRequest) -> Result<f64> + Send + Sync + 'static,
    {
        async fn execute(&self, request: CodeRequest) -> Result<f64> {
            (self.0)(request)
        }
    }

    Arc::new(ClosureSandbox(f))
}

/// Wrap a closure as a [`ChatClient`]. The API key is not passed through.
pub fn chat_fn<F>(f: F) -> Arc<dyn ChatClient>
where
    F: Fn(Vec<ChatMessage>) -> Result<String> + Send + Sync + 'static,
{
    struct ClosureChat<F>(F);

    #[async_trait]
    impl<F> ChatClient for ClosureChat<F>
    where
        F: Fn(Vec<ChatMessage>) -> Result<String> + Send + Sync + 'static,
    {
        async fn complete(&self, _api_key: &str, messages: Vec<ChatMessage>) -> Result<String> {
            (self.0)(messages)
        }
    }

    Arc::new(ClosureChat(f))
}

/// Wrap a closure as an [`EmbeddingClient`].
pub fn embed_fn<F>(f: F) -> Arc<dyn EmbeddingClient>
where
    F: Fn(&str) -> Result<Vec<f32>> + Send + Sync + 'static,
{
    struct ClosureEmbed<F>(F);

    #[async_trait]
    impl<F> EmbeddingClient for ClosureEmbed<F>
    where
        F: Fn(&str) -> Result<Vec<f32>> + Send + Sync + 'static,
    {
        async fn embed(&self, _api_key: &str, text: &str) -> Result<Vec<f32>> {
            (self.0)(text)
        }
    }

    Arc::new(ClosureEmbed(f))
}

/// Wrap a closure as a [`RagScorer`].
pub fn rag_fn<F>(f: F) -> Arc<dyn RagScorer>
where
    F: Fn(RagMetric, RagSample) -> Result<f64> + Send + Sync + 'static,
{
    struct ClosureRag<F>(F);

    #[async_trait]
    impl<F> RagScorer for ClosureRag<F>
    where
        F: Fn(RagMetric, RagSample) -> Result<f64> + Send + Sync + 'static,
    {
        async fn score(&self, metric: RagMetric, _api_key: &str, sample: RagSample) -> Result<f64> {
            (self.0)(metric, sample)
        }
    }

    Arc::new(ClosureRag(f))
}

/// Wrap a closure as a [`TraceAssembler`].
pub fn assembler_fn<F>(f: F) -> Arc<dyn TraceAssembler>
where
    F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
{
    struct ClosureAssembler<F>(F);

    impl<F> TraceAssembler for ClosureAssembler<F>
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        fn assemble(&self, raw: &Value) -> Result<Value> {
            (self.0)(raw)
        }
    }

    Arc::new(ClosureAssembler(f))
}
