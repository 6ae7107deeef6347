//! Description/keyword similarity fusion.
//!
//! `score = lambda * cos(q, description) + (1 - lambda) * cos(q, keywords)`,
//! computed independently for each fragment pool.

use ordered_float::OrderedFloat;

use super::similarity::cosine_similarity;
use crate::error::{RecollectError, RecollectResult};
use crate::types::{EmbeddedText, ScoredFragment};

/// A fragment with both of its embeddings bound and verified.
#[derive(Debug, Clone)]
pub struct Candidate<F> {
    /// Position of the fragment in its fragment file.
    pub index: usize,
    pub fragment: F,
    pub description: EmbeddedText,
    pub keywords: EmbeddedText,
}

/// Linear fusion of description and keyword cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityFusion {
    lambda: f32,
}

impl Default for SimilarityFusion {
    fn default() -> Self {
        Self { lambda: 0.5 }
    }
}

impl SimilarityFusion {
    /// Create a fusion scorer. `lambda` must lie in [0, 1].
    pub fn new(lambda: f32) -> RecollectResult<Self> {
        if !(0.0..=1.0).contains(&lambda) {
            return Err(RecollectError::out_of_range("lambda", lambda, "between 0.0 and 1.0"));
        }
        Ok(Self { lambda })
    }

    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    /// Fused score from precomputed similarity terms.
    pub fn combine(&self, description_sim: f32, keyword_sim: f32) -> f32 {
        self.lambda * description_sim + (1.0 - self.lambda) * keyword_sim
    }

    /// Fused score of one candidate against the query.
    pub fn score<F>(&self, query: &[f32], candidate: &Candidate<F>) -> f32 {
        self.combine(
            cosine_similarity(query, candidate.description.vector()),
            cosine_similarity(query, candidate.keywords.vector()),
        )
    }

    /// Order candidates by fused score, highest first, and keep `top_k`.
    /// Equal scores keep input order.
    pub fn rank<F>(
        &self,
        query: &[f32],
        candidates: Vec<Candidate<F>>,
        top_k: usize,
    ) -> Vec<ScoredFragment<F>> {
        let mut scored: Vec<ScoredFragment<F>> = candidates
            .into_iter()
            .map(|c| {
                let fused = self.score(query, &c);
                ScoredFragment::new(c.index, c.fragment, fused)
            })
            .collect();

        scored.sort_by(|a, b| OrderedFloat(b.fused_score).cmp(&OrderedFloat(a.fused_score)));
        scored.truncate(top_k);
        scored
    }
}
