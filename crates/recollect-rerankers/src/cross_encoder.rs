//! Self-hosted cross-encoder reranker.
//!
//! Speaks the text-embeddings-inference `/rerank` protocol:
//! `POST {base_url}/rerank {"query", "texts"}` answers `[{"index", "score"}]`.

use async_trait::async_trait;

use recollect_core::error::{RecollectError, RecollectResult};
use recollect_core::traits::{Reranker, RerankerConfig};

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::scores::in_input_order;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Cross-encoder served over HTTP.
pub struct CrossEncoderReranker {
    client: Client,
    model: String,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

impl CrossEncoderReranker {
    pub fn new(config: RerankerConfig) -> RecollectResult<Self> {
        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RecollectError::Configuration(format!(
                "Invalid cross-encoder URL: {}",
                base_url
            )));
        }

        Ok(Self {
            client: Client::new(),
            model: config.model,
            base_url,
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn score(&self, query: &str, documents: &[String]) -> RecollectResult<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&RerankRequest {
                query,
                texts: documents,
                raw_scores: false,
            });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            RecollectError::reranker(format!("Failed to call cross-encoder at {}: {}", self.base_url, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(RecollectError::reranker(format!(
                "Cross-encoder error ({}): {}",
                status, error
            )));
        }

        let hits: Vec<RerankHit> = response
            .json()
            .await
            .map_err(|e| RecollectError::reranker(format!("Failed to parse response: {}", e)))?;

        in_input_order(hits.into_iter().map(|h| (h.index, h.score)), documents.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
