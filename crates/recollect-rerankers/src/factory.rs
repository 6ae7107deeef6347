//! Factory for creating reranker providers.

use std::sync::Arc;

use recollect_core::error::{RecollectError, RecollectResult};
use recollect_core::traits::{Llm, Reranker, RerankerConfig, RerankerProvider};

/// Factory for creating reranker providers.
pub struct RerankerFactory;

impl RerankerFactory {
    /// Create a reranker from the given configuration.
    ///
    /// The `llm` provider judges relevance with `judge`, which must be given.
    pub fn create(
        config: RerankerConfig,
        judge: Option<Arc<dyn Llm>>,
    ) -> RecollectResult<Arc<dyn Reranker>> {
        tracing::debug!(provider = ?config.provider, model = %config.model, "Creating reranker");
        match config.provider {
            #[cfg(feature = "cohere")]
            RerankerProvider::Cohere => Ok(Arc::new(crate::cohere::CohereReranker::new(config)?)),

            #[cfg(feature = "cross-encoder")]
            RerankerProvider::CrossEncoder => Ok(Arc::new(
                crate::cross_encoder::CrossEncoderReranker::new(config)?,
            )),

            #[cfg(feature = "llm")]
            RerankerProvider::Llm => {
                let llm = judge.ok_or_else(|| {
                    RecollectError::Configuration(
                        "The llm reranker needs an [llm] section to judge relevance".to_string(),
                    )
                })?;
                Ok(Arc::new(crate::llm_reranker::LlmReranker::new(llm)))
            }

            #[allow(unreachable_patterns)]
            provider => {
                let _ = judge;
                Err(RecollectError::UnsupportedProvider {
                    provider: format!("{:?}", provider),
                })
            }
        }
    }

    /// Create a Cohere reranker.
    #[cfg(feature = "cohere")]
    pub fn cohere(api_key: &str) -> RecollectResult<Arc<dyn Reranker>> {
        let config = RerankerConfig {
            api_key: Some(api_key.to_string()),
            ..Default::default()
        };
        Ok(Arc::new(crate::cohere::CohereReranker::new(config)?))
    }

    /// Create a reranker for a self-hosted cross-encoder.
    #[cfg(feature = "cross-encoder")]
    pub fn cross_encoder(
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> RecollectResult<Arc<dyn Reranker>> {
        let config = RerankerConfig {
            provider: RerankerProvider::CrossEncoder,
            model: model.into(),
            api_key: None,
            base_url: Some(base_url.into()),
        };
        Ok(Arc::new(crate::cross_encoder::CrossEncoderReranker::new(config)?))
    }
}
