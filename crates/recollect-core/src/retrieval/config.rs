//! Retrieval configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecollectError, RecollectResult};
use crate::types::RetrievalRequest;

/// Retrieval orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Weight of description similarity against keyword similarity.
    /// Range: 0.0-1.0. Default: 0.5
    pub lambda: f32,
    /// Fused shortlist size per pool. Default: 10
    pub top_k: usize,
    /// Final result size per pool, at most `top_k`. Default: 3
    pub top_n: usize,
    /// Query encoding deadline in milliseconds.
    pub encoder_timeout_ms: u64,
    /// Cross-encoder deadline in milliseconds; exceeding it falls back to
    /// fused order.
    pub reranker_timeout_ms: u64,
    /// Requests in flight during batch retrieval.
    pub max_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            lambda: 0.5,
            top_k: 10,
            top_n: 3,
            encoder_timeout_ms: 30_000,
            reranker_timeout_ms: 30_000,
            max_concurrency: 4,
        }
    }
}

/// Ranking parameters for one request after applying its overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingParams {
    pub lambda: f32,
    pub top_k: usize,
    pub top_n: usize,
}

impl RankingParams {
    pub fn validate(&self) -> RecollectResult<()> {
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(RecollectError::out_of_range("lambda", self.lambda, "between 0.0 and 1.0"));
        }
        if self.top_k == 0 {
            return Err(RecollectError::out_of_range("top_k", self.top_k, "at least 1"));
        }
        if self.top_n == 0 || self.top_n >= self.top_k {
            return Err(RecollectError::out_of_range(
                "top_n",
                self.top_n,
                "at least 1 and below top_k",
            ));
        }
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn encoder_timeout(&self) -> Duration {
        Duration::from_millis(self.encoder_timeout_ms)
    }

    pub fn reranker_timeout(&self) -> Duration {
        Duration::from_millis(self.reranker_timeout_ms)
    }

    /// Configured ranking parameters.
    pub fn params(&self) -> RankingParams {
        RankingParams {
            lambda: self.lambda,
            top_k: self.top_k,
            top_n: self.top_n,
        }
    }

    /// Ranking parameters for `request`, validated.
    pub fn params_for(&self, request: &RetrievalRequest) -> RecollectResult<RankingParams> {
        let params = RankingParams {
            lambda: request.lambda.unwrap_or(self.lambda),
            top_k: request.top_k.unwrap_or(self.top_k),
            top_n: request.top_n.unwrap_or(self.top_n),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> RecollectResult<()> {
        self.params().validate()?;
        if self.encoder_timeout_ms == 0 {
            return Err(RecollectError::out_of_range("encoder_timeout_ms", 0, "at least 1"));
        }
        if self.reranker_timeout_ms == 0 {
            return Err(RecollectError::out_of_range("reranker_timeout_ms", 0, "at least 1"));
        }
        if self.max_concurrency == 0 {
            return Err(RecollectError::out_of_range("max_concurrency", 0, "at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.params(), RankingParams { lambda: 0.5, top_k: 10, top_n: 3 });
    }

    #[test]
    fn test_request_overrides() {
        let config = RetrievalConfig::default();
        let request = RetrievalRequest::new("s", "d", "c", "q").with_lambda(0.8).with_top_n(5);
        let params = config.params_for(&request).unwrap();
        assert_eq!(params.lambda, 0.8);
        assert_eq!(params.top_k, 10);
        assert_eq!(params.top_n, 5);
    }

    #[test]
    fn test_rejects_invalid_params() {
        let config = RetrievalConfig::default();
        for request in [
            RetrievalRequest::new("s", "d", "c", "q").with_lambda(1.5),
            RetrievalRequest::new("s", "d", "c", "q").with_lambda(f32::NAN),
            RetrievalRequest::new("s", "d", "c", "q").with_top_n(0),
            RetrievalRequest::new("s", "d", "c", "q").with_top_k(2),
            RetrievalRequest::new("s", "d", "c", "q").with_top_n(10),
        ] {
            let err = config.params_for(&request).unwrap_err();
            assert!(matches!(err, RecollectError::Validation { .. }));
        }
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let config = RetrievalConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
