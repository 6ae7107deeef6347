//! Cross-encoder rerank stage over a fused shortlist.

use std::sync::Arc;
use std::time::Duration;

use ordered_float::OrderedFloat;

use crate::error::{RecollectError, RecollectResult};
use crate::traits::Reranker;
use crate::types::{MemoryFragment, PersonaFragment, ScoredFragment};

/// Text a cross-encoder judges for a fragment.
pub trait RerankDocument {
    fn rerank_text(&self) -> &str;
}

impl RerankDocument for PersonaFragment {
    fn rerank_text(&self) -> &str {
        &self.description
    }
}

impl RerankDocument for MemoryFragment {
    fn rerank_text(&self) -> &str {
        &self.description
    }
}

/// Wraps a [`Reranker`] with a deadline and top-N selection.
#[derive(Clone)]
pub struct RerankAdapter {
    reranker: Arc<dyn Reranker>,
    timeout: Duration,
}

impl RerankAdapter {
    pub fn new(reranker: Arc<dyn Reranker>, timeout: Duration) -> Self {
        Self { reranker, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.reranker.model_name()
    }

    /// Reorder `candidates` by cross-encoder relevance and keep `top_n`.
    ///
    /// An empty shortlist returns immediately without calling the reranker.
    /// Any failure, including a timeout or a score count that does not match
    /// the shortlist, is a `RerankerUnavailable` error.
    pub async fn rerank<F: RerankDocument>(
        &self,
        query: &str,
        candidates: Vec<ScoredFragment<F>>,
        top_n: usize,
    ) -> RecollectResult<Vec<ScoredFragment<F>>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let documents: Vec<String> = candidates
            .iter()
            .map(|c| c.fragment.rerank_text().to_string())
            .collect();

        let scores = tokio::time::timeout(self.timeout, self.reranker.score(query, &documents))
            .await
            .map_err(|_| RecollectError::reranker_timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| match e {
                e @ RecollectError::RerankerUnavailable { .. } => e,
                other => RecollectError::reranker(other.to_string()),
            })?;

        if scores.len() != candidates.len() {
            return Err(RecollectError::reranker(format!(
                "expected {} scores, got {}",
                candidates.len(),
                scores.len()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(RecollectError::reranker("non-finite relevance score"));
        }

        let mut reranked: Vec<ScoredFragment<F>> = candidates
            .into_iter()
            .zip(scores)
            .map(|(mut c, score)| {
                c.rerank_score = Some(score);
                c
            })
            .collect();

        reranked.sort_by(|a, b| OrderedFloat(b.score()).cmp(&OrderedFloat(a.score())));
        reranked.truncate(top_n);
        Ok(reranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Doc(&'static str);

    impl RerankDocument for Doc {
        fn rerank_text(&self) -> &str {
            self.0
        }
    }

    /// Scores a document by its length.
    struct LengthReranker {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Reranker for LengthReranker {
        async fn score(&self, _query: &str, documents: &[String]) -> RecollectResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(documents.iter().map(|d| d.len() as f32).collect())
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    struct SlowReranker;

    #[async_trait]
    impl Reranker for SlowReranker {
        async fn score(&self, _query: &str, documents: &[String]) -> RecollectResult<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![0.0; documents.len()])
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    struct ShortReranker;

    #[async_trait]
    impl Reranker for ShortReranker {
        async fn score(&self, _query: &str, _documents: &[String]) -> RecollectResult<Vec<f32>> {
            Ok(vec![1.0])
        }

        fn model_name(&self) -> &str {
            "short"
        }
    }

    fn shortlist() -> Vec<ScoredFragment<Doc>> {
        vec![
            ScoredFragment::new(0, Doc("a"), 0.9),
            ScoredFragment::new(1, Doc("abcd"), 0.8),
            ScoredFragment::new(2, Doc("ab"), 0.7),
            ScoredFragment::new(3, Doc("abc"), 0.6),
        ]
    }

    #[tokio::test]
    async fn test_reorders_by_relevance() {
        let reranker = Arc::new(LengthReranker { calls: AtomicUsize::new(0) });
        let adapter = RerankAdapter::new(reranker.clone(), Duration::from_secs(1));
        let result = adapter.rerank("q", shortlist(), 3).await.unwrap();

        let order: Vec<usize> = result.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![1, 3, 2]);
        assert_eq!(result[0].rerank_score, Some(4.0));
        assert_eq!(result[0].fused_score, 0.8);
        assert_eq!(reranker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_shortlist_skips_call() {
        let reranker = Arc::new(LengthReranker { calls: AtomicUsize::new(0) });
        let adapter = RerankAdapter::new(reranker.clone(), Duration::from_secs(1));
        let result = adapter.rerank::<Doc>("q", Vec::new(), 3).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(reranker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let adapter = RerankAdapter::new(Arc::new(SlowReranker), Duration::from_millis(50));
        let err = adapter.rerank("q", shortlist(), 3).await.unwrap_err();
        assert!(matches!(err, RecollectError::RerankerUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_score_count_mismatch_is_unavailable() {
        let adapter = RerankAdapter::new(Arc::new(ShortReranker), Duration::from_secs(1));
        let err = adapter.rerank("q", shortlist(), 3).await.unwrap_err();
        assert!(matches!(err, RecollectError::RerankerUnavailable { .. }));
    }
}
