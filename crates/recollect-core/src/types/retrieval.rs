//! Retrieval request and result types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fragment::{MemoryFragment, PersonaFragment};

/// One tutoring retrieval: a learner, a target concept, and a free-text query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub learner_id: String,
    pub dataset_id: String,
    /// Concept display text; memory fragments are filtered to it.
    pub concept: String,
    pub query: String,
    /// Overrides the configured fusion weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f32>,
    /// Overrides the configured fused shortlist size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Overrides the configured final result size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,
}

impl RetrievalRequest {
    /// Create a request using the engine's configured lambda, K and N.
    pub fn new(
        learner_id: impl Into<String>,
        dataset_id: impl Into<String>,
        concept: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            learner_id: learner_id.into(),
            dataset_id: dataset_id.into(),
            concept: concept.into(),
            query: query.into(),
            lambda: None,
            top_k: None,
            top_n: None,
        }
    }

    /// Set the fusion weight.
    pub fn with_lambda(mut self, lambda: f32) -> Self {
        self.lambda = Some(lambda);
        self
    }

    /// Set the fused shortlist size.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Set the final result size.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }
}

/// A fragment selected for a query, with its scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredFragment<F> {
    /// Position of the fragment in the learner's fragment file.
    pub index: usize,
    pub fragment: F,
    /// Fused embedding similarity.
    pub fused_score: f32,
    /// Cross-encoder relevance, when the rerank stage ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl<F> ScoredFragment<F> {
    pub fn new(index: usize, fragment: F, fused_score: f32) -> Self {
        Self {
            index,
            fragment,
            fused_score,
            rerank_score: None,
        }
    }

    /// Final score used for ordering.
    pub fn score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.fused_score)
    }
}

/// Which ordering both pools of a result went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RankingStage {
    /// Both pools were reordered by the cross-encoder.
    Reranked,
    /// Both pools kept fused-similarity order.
    Fused { reason: String },
}

impl RankingStage {
    pub fn is_reranked(&self) -> bool {
        matches!(self, Self::Reranked)
    }
}

/// Top persona and memory fragments for one query. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub request_id: Uuid,
    pub learner_id: String,
    pub concept: String,
    pub persona: Vec<ScoredFragment<PersonaFragment>>,
    pub memory: Vec<ScoredFragment<MemoryFragment>>,
    pub stage: RankingStage,
    /// Fragments skipped for missing, stale or mismatched embeddings.
    pub dropped: usize,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.persona.is_empty() && self.memory.is_empty()
    }
}
