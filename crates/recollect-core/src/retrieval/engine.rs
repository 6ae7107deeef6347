//! Retrieval orchestrator.
//!
//! One request runs strictly in order: encode the query, load and bind both
//! fragment pools, fuse to a top-K shortlist per pool, then rerank both
//! shortlists to top-N. Both pools always end on the same ranking stage.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::config::{RankingParams, RetrievalConfig};
use super::fusion::{Candidate, SimilarityFusion};
use super::rerank::RerankAdapter;
use crate::error::{RecollectError, RecollectResult};
use crate::store::FragmentStore;
use crate::traits::{Embedder, Reranker};
use crate::types::{
    EmbeddedText, EmbeddingKind, EmbeddingSet, MemoryFragment, PersonaFragment, Pool,
    RankingStage, RetrievalRequest, RetrievalResult, ScoredFragment,
};

/// Stage reason recorded when no cross-encoder is attached.
pub const RERANKER_NOT_CONFIGURED: &str = "not configured";

/// Produces persona and memory context for tutoring queries.
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn FragmentStore>,
    reranker: Option<RerankAdapter>,
    config: RetrievalConfig,
}

/// Candidates of one pool plus the number of fragments that could not be bound.
struct BoundPool<F> {
    candidates: Vec<Candidate<F>>,
    dropped: usize,
}

impl RetrievalEngine {
    /// Create an engine without a reranker; results stay in fused order.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn FragmentStore>,
        config: RetrievalConfig,
    ) -> RecollectResult<Self> {
        config.validate()?;
        Ok(Self {
            embedder,
            store,
            reranker: None,
            config,
        })
    }

    /// Attach a cross-encoder for the final stage.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(RerankAdapter::new(reranker, self.config.reranker_timeout()));
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    /// Retrieve the top persona and memory fragments for one query.
    ///
    /// Fails only on invalid parameters, encoder failure, or unreadable
    /// store data. Missing files, missing embeddings and reranker failures
    /// degrade the result instead.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> RecollectResult<RetrievalResult> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "retrieve",
            %request_id,
            learner_id = %request.learner_id,
            dataset_id = %request.dataset_id
        );
        self.run(request_id, request).instrument(span).await
    }

    async fn run(&self, request_id: Uuid, request: &RetrievalRequest) -> RecollectResult<RetrievalResult> {
        let params = self.config.params_for(request)?;
        let fusion = SimilarityFusion::new(params.lambda)?;

        let query = self.encode(&request.query).await?;

        let persona = self.bind_persona(request, query.len()).await?;
        let memory = self.bind_memory(request, query.len()).await?;
        let dropped = persona.dropped + memory.dropped;

        let persona = fusion.rank(&query, persona.candidates, params.top_k);
        let memory = fusion.rank(&query, memory.candidates, params.top_k);
        tracing::debug!(
            persona = persona.len(),
            memory = memory.len(),
            dropped,
            "Fused shortlists"
        );

        let (persona, memory, stage) = self.rerank(&request.query, persona, memory, params).await;

        tracing::info!(
            persona = persona.len(),
            memory = memory.len(),
            reranked = stage.is_reranked(),
            "Retrieval complete"
        );

        Ok(RetrievalResult {
            request_id,
            learner_id: request.learner_id.clone(),
            concept: request.concept.clone(),
            persona,
            memory,
            stage,
            dropped,
        })
    }

    async fn encode(&self, query: &str) -> RecollectResult<Vec<f32>> {
        let timeout = self.config.encoder_timeout();
        let vector = tokio::time::timeout(timeout, self.embedder.embed(query))
            .await
            .map_err(|_| RecollectError::encoder_timeout(self.config.encoder_timeout_ms))?
            .map_err(|e| match e {
                e @ RecollectError::EncoderUnavailable { .. } => e,
                other => RecollectError::encoder(other.to_string()),
            })?;

        if vector.is_empty() {
            return Err(RecollectError::encoder("encoder returned an empty vector"));
        }
        Ok(vector)
    }

    async fn bind_persona(
        &self,
        request: &RetrievalRequest,
        dimension: usize,
    ) -> RecollectResult<BoundPool<PersonaFragment>> {
        let fragments = absent_as_empty(
            self.store
                .persona_fragments(&request.dataset_id, &request.learner_id)
                .await,
            Pool::Persona,
        )?;
        if fragments.is_empty() {
            return Ok(BoundPool { candidates: Vec::new(), dropped: 0 });
        }

        let (descriptions, keywords) = self.load_embeddings(request, Pool::Persona).await?;
        let mut pool = BoundPool { candidates: Vec::new(), dropped: 0 };
        for (index, fragment) in fragments.into_iter().enumerate() {
            let description = bind(&descriptions, index, &fragment.description, dimension);
            let keyword = bind(&keywords, index, &fragment.keywords, dimension);
            match (description, keyword) {
                (Some(description), Some(keywords)) => pool.candidates.push(Candidate {
                    index,
                    fragment,
                    description,
                    keywords,
                }),
                (description, _) => {
                    let kind = if description.is_none() {
                        EmbeddingKind::Description
                    } else {
                        EmbeddingKind::Keywords
                    };
                    log_dropped(Pool::Persona, index, kind);
                    pool.dropped += 1;
                }
            }
        }
        Ok(pool)
    }

    async fn bind_memory(
        &self,
        request: &RetrievalRequest,
        dimension: usize,
    ) -> RecollectResult<BoundPool<MemoryFragment>> {
        let fragments = absent_as_empty(
            self.store
                .memory_fragments(&request.dataset_id, &request.learner_id)
                .await,
            Pool::Memory,
        )?;

        let matching: Vec<(usize, MemoryFragment)> = fragments
            .into_iter()
            .enumerate()
            .filter(|(_, f)| f.matches_concept(&request.concept))
            .collect();
        if matching.is_empty() {
            return Ok(BoundPool { candidates: Vec::new(), dropped: 0 });
        }

        let (descriptions, keywords) = self.load_embeddings(request, Pool::Memory).await?;
        let mut pool = BoundPool { candidates: Vec::new(), dropped: 0 };
        for (index, fragment) in matching {
            let Some(description) = bind(&descriptions, index, &fragment.description, dimension)
            else {
                log_dropped(Pool::Memory, index, EmbeddingKind::Description);
                pool.dropped += 1;
                continue;
            };
            let keywords = match bind(&keywords, index, fragment.keywords_text(), dimension) {
                Some(vector) => vector,
                None => {
                    if fragment.keywords.is_some() {
                        tracing::debug!(
                            fragment_index = index,
                            "No current keywords embedding, using description"
                        );
                    }
                    description.clone()
                }
            };
            pool.candidates.push(Candidate {
                index,
                fragment,
                description,
                keywords,
            });
        }
        Ok(pool)
    }

    async fn load_embeddings(
        &self,
        request: &RetrievalRequest,
        pool: Pool,
    ) -> RecollectResult<(EmbeddingSet, EmbeddingSet)> {
        let descriptions = self
            .embedding_set(request, pool, EmbeddingKind::Description)
            .await?;
        let keywords = self
            .embedding_set(request, pool, EmbeddingKind::Keywords)
            .await?;
        Ok((descriptions, keywords))
    }

    async fn embedding_set(
        &self,
        request: &RetrievalRequest,
        pool: Pool,
        kind: EmbeddingKind,
    ) -> RecollectResult<EmbeddingSet> {
        match self
            .store
            .embeddings(&request.dataset_id, &request.learner_id, pool, kind)
            .await
        {
            Ok(set) => Ok(set),
            Err(RecollectError::MissingFragmentFile { path }) => {
                tracing::warn!(%pool, %kind, path = %path.display(), "Embedding file missing");
                Ok(EmbeddingSet::default())
            }
            Err(e) => Err(e),
        }
    }

    async fn rerank(
        &self,
        query: &str,
        persona: Vec<ScoredFragment<PersonaFragment>>,
        memory: Vec<ScoredFragment<MemoryFragment>>,
        params: RankingParams,
    ) -> (
        Vec<ScoredFragment<PersonaFragment>>,
        Vec<ScoredFragment<MemoryFragment>>,
        RankingStage,
    ) {
        let Some(adapter) = &self.reranker else {
            return fused_fallback(persona, memory, params.top_n, RERANKER_NOT_CONFIGURED.to_string());
        };

        let (reranked_persona, reranked_memory) = tokio::join!(
            adapter.rerank(query, persona.clone(), params.top_n),
            adapter.rerank(query, memory.clone(), params.top_n),
        );

        match (reranked_persona, reranked_memory) {
            (Ok(p), Ok(m)) => (p, m, RankingStage::Reranked),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(
                    model = adapter.model_name(),
                    error = %e,
                    "Reranker unavailable, using fused order"
                );
                fused_fallback(persona, memory, params.top_n, e.to_string())
            }
        }
    }
}

fn fused_fallback(
    mut persona: Vec<ScoredFragment<PersonaFragment>>,
    mut memory: Vec<ScoredFragment<MemoryFragment>>,
    top_n: usize,
    reason: String,
) -> (
    Vec<ScoredFragment<PersonaFragment>>,
    Vec<ScoredFragment<MemoryFragment>>,
    RankingStage,
) {
    persona.truncate(top_n);
    memory.truncate(top_n);
    (persona, memory, RankingStage::Fused { reason })
}

fn absent_as_empty<T>(result: RecollectResult<Vec<T>>, pool: Pool) -> RecollectResult<Vec<T>> {
    match result {
        Ok(fragments) => Ok(fragments),
        Err(RecollectError::MissingFragmentFile { path }) => {
            tracing::warn!(%pool, path = %path.display(), "Fragment file missing, pool is empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Bind `text` to its stored embedding when the hash and dimension match.
fn bind(set: &EmbeddingSet, index: usize, text: &str, dimension: usize) -> Option<EmbeddedText> {
    set.get(index)
        .and_then(|stored| EmbeddedText::bind(text, stored))
        .filter(|embedded| embedded.dimension() == dimension)
}

fn log_dropped(pool: Pool, fragment_index: usize, kind: EmbeddingKind) {
    let err = RecollectError::missing_embedding(
        format!("no current {} embedding", kind),
        Some(fragment_index),
    );
    tracing::warn!(%pool, fragment_index, error = %err, "Dropping fragment");
}
