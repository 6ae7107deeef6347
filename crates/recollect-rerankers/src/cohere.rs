//! Cohere reranker implementation.

use async_trait::async_trait;

use recollect_core::error::{RecollectError, RecollectResult};
use recollect_core::traits::{Reranker, RerankerConfig};

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::scores::in_input_order;

const COHERE_API_URL: &str = "https://api.cohere.ai/v1";

/// Cohere reranker implementation.
pub struct CohereReranker {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CohereRerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
    return_documents: bool,
}

#[derive(Debug, Deserialize)]
struct CohereRerankResponse {
    results: Vec<CohereRerankResult>,
}

#[derive(Debug, Deserialize)]
struct CohereRerankResult {
    index: usize,
    relevance_score: f32,
}

impl CohereReranker {
    /// Create a new Cohere reranker.
    pub fn new(config: RerankerConfig) -> RecollectResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("COHERE_API_KEY").ok())
            .ok_or_else(|| {
                RecollectError::Configuration(
                    "Cohere API key required. Set COHERE_API_KEY or provide api_key.".to_string(),
                )
            })?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model,
            base_url: config
                .base_url
                .unwrap_or_else(|| COHERE_API_URL.to_string()),
        })
    }
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn score(&self, query: &str, documents: &[String]) -> RecollectResult<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let request = CohereRerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: documents.len(),
            return_documents: false,
        };

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecollectError::reranker(format!("Failed to call Cohere API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(RecollectError::reranker(format!(
                "Cohere API error ({}): {}",
                status, error
            )));
        }

        let result: CohereRerankResponse = response
            .json()
            .await
            .map_err(|e| RecollectError::reranker(format!("Failed to parse response: {}", e)))?;

        in_input_order(
            result.results.into_iter().map(|r| (r.index, r.relevance_score)),
            documents.len(),
        )
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_asks_for_every_document() {
        let documents = vec!["a".to_string(), "b".to_string()];
        let request = CohereRerankRequest {
            model: "rerank-english-v3.0",
            query: "q",
            documents: &documents,
            top_n: documents.len(),
            return_documents: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["top_n"], 2);
        assert_eq!(json["return_documents"], false);
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"id":"x","results":[{"index":1,"relevance_score":0.9},{"index":0,"relevance_score":0.2}]}"#;
        let response: CohereRerankResponse = serde_json::from_str(body).unwrap();
        let scores = in_input_order(
            response.results.into_iter().map(|r| (r.index, r.relevance_score)),
            2,
        )
        .unwrap();
        assert_eq!(scores, vec![0.2, 0.9]);
    }
}
