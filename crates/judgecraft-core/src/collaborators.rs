//! Seams to the services evaluators delegate to.
//!
//! The engine never owns a sandbox, an LLM or a RAG metric implementation;
//! the hosting process plugs them in through [`Collaborators`].

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use judgecraft_types::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{EngineConfig, OpenAiConfig};

/// Everything a sandboxed custom-code run receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeRequest {
    pub app_config: Value,
    pub inputs: JsonMap,
    pub output: Value,
    pub ground_truth: Value,
    pub code: String,
    pub datapoint: Value,
}

/// Runs caller-supplied scoring code in isolation.
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    async fn execute(&self, request: CodeRequest) -> Result<f64>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Single-shot chat completion.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, api_key: &str, messages: Vec<ChatMessage>) -> Result<String>;
}

/// Text embedding. Vectors are expected to be unit-normalized.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, api_key: &str, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RagMetric {
    Faithfulness,
    ContextRelevancy,
}

/// Values pulled out of a trace for a RAG metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagSample {
    pub question: Value,
    pub answer: Value,
    pub contexts: Value,
}

/// Third-party RAG metric provider.
#[async_trait]
pub trait RagScorer: Send + Sync {
    async fn score(&self, metric: RagMetric, api_key: &str, sample: RagSample) -> Result<f64>;
}

/// Turns a raw distributed trace into the nested trace tree.
pub trait TraceAssembler: Send + Sync {
    fn assemble(&self, raw: &Value) -> Result<Value>;
}

/// Host-provided services. Absent entries make the evaluators that need
/// them fail with a configuration error.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub http: reqwest::Client,
    pub sandbox: Option<Arc<dyn CodeSandbox>>,
    pub chat: Option<Arc<dyn ChatClient>>,
    pub embeddings: Option<Arc<dyn EmbeddingClient>>,
    pub rag: Option<Arc<dyn RagScorer>>,
    pub traces: Option<Arc<dyn TraceAssembler>>,
}

impl Collaborators {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http, ..Self::default() }
    }

    /// HTTP client from config with the OpenAI client wired for chat and embeddings.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let http = config.http_client()?;
        let openai = Arc::new(OpenAiClient::new(http.clone(), config.openai.clone()));
        Ok(Self::new(http).with_chat(openai.clone()).with_embeddings(openai))
    }

    pub fn with_sandbox(mut self, sandbox: Arc<dyn CodeSandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_embeddings(mut self, embeddings: Arc<dyn EmbeddingClient>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_rag(mut self, rag: Arc<dyn RagScorer>) -> Self {
        self.rag = Some(rag);
        self
    }

    pub fn with_traces(mut self, traces: Arc<dyn TraceAssembler>) -> Self {
        self.traces = Some(traces);
        self
    }
}

/// OpenAI-compatible REST client for chat completions and embeddings.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, api_key: &str, path: &str, body: Value) -> Result<T> {
        let resp = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("OpenAI request to {path} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI {path} returned HTTP {}: {}", status.as_u16(), text);
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("Malformed OpenAI {path} response"))
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, api_key: &str, messages: Vec<ChatMessage>) -> Result<String> {
        let body = json!({
            "model": self.config.chat_model,
            "messages": messages,
            "temperature": self.config.temperature,
        });
        let resp: ChatResponse = self.post(api_key, "chat/completions", body).await?;
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenAI chat response has no choices"))?;
        Ok(choice.message.content.trim().to_string())
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiClient {
    async fn embed(&self, api_key: &str, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.config.embedding_model,
            "input": text,
        });
        let resp: EmbeddingResponse = self.post(api_key, "embeddings", body).await?;
        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow!("OpenAI embedding response has no data"))
    }
}
