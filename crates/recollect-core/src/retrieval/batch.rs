//! Bounded-concurrency batch retrieval.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::engine::RetrievalEngine;
use crate::error::RecollectResult;
use crate::types::{RetrievalRequest, RetrievalResult};

/// Runs many independent retrievals with a cap on requests in flight.
///
/// The encoder and cross-encoder usually share one accelerator, so the cap
/// bounds concurrent calls into them. Results come back in request order.
#[derive(Clone)]
pub struct BatchRetriever {
    engine: Arc<RetrievalEngine>,
    max_concurrency: usize,
}

impl BatchRetriever {
    /// Use the engine's configured `max_concurrency`.
    pub fn new(engine: Arc<RetrievalEngine>) -> Self {
        let max_concurrency = engine.config().max_concurrency;
        Self {
            engine,
            max_concurrency,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Retrieve every request. One failed request does not affect the others.
    pub async fn retrieve_all(
        &self,
        requests: Vec<RetrievalRequest>,
    ) -> Vec<RecollectResult<RetrievalResult>> {
        tracing::info!(
            requests = requests.len(),
            max_concurrency = self.max_concurrency,
            "Starting batch retrieval"
        );

        stream::iter(requests)
            .map(|request| {
                let engine = Arc::clone(&self.engine);
                async move { engine.retrieve(&request).await }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}
