//! Cross-encoder reranker trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecollectResult;

/// Pairwise relevance judge - all cross-encoder providers implement this.
///
/// Implementations score every document against the query in one batched call
/// and return the scores in input order.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score each document's relevance to the query.
    async fn score(&self, query: &str, documents: &[String]) -> RecollectResult<Vec<f32>>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// Reranker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Provider type.
    pub provider: RerankerProvider,
    /// Model name/identifier.
    pub model: String,
    /// API key (if not using environment variable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for self-hosted services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            provider: RerankerProvider::Cohere,
            model: "rerank-english-v3.0".to_string(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Reranker provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RerankerProvider {
    #[default]
    Cohere,
    /// Self-hosted cross-encoder behind a `/rerank` endpoint.
    CrossEncoder,
    /// LLM used as a relevance judge.
    Llm,
}
