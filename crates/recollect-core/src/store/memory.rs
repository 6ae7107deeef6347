//! In-memory fragment store.

use std::collections::HashMap;

use async_trait::async_trait;

use super::FragmentStore;
use crate::error::{RecollectError, RecollectResult};
use crate::types::{
    EmbeddingKind, EmbeddingSet, MemoryFragment, PersonaFragment, Pool, StoredEmbedding,
};

type LearnerKey = (String, String);

/// Fragment banks held in memory, populated up front.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFragmentStore {
    persona: HashMap<LearnerKey, Vec<PersonaFragment>>,
    memory: HashMap<LearnerKey, Vec<MemoryFragment>>,
    embeddings: HashMap<(String, String, Pool, EmbeddingKind), EmbeddingSet>,
}

fn key(dataset_id: &str, learner_id: &str) -> LearnerKey {
    (dataset_id.to_string(), learner_id.to_string())
}

fn missing(dataset_id: &str, learner_id: &str, what: &str) -> RecollectError {
    RecollectError::missing_file(format!("memory://{}/{}/{}", dataset_id, what, learner_id))
}

impl InMemoryFragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persona(
        mut self,
        dataset_id: &str,
        learner_id: &str,
        fragments: Vec<PersonaFragment>,
    ) -> Self {
        self.persona.insert(key(dataset_id, learner_id), fragments);
        self
    }

    pub fn with_memory(
        mut self,
        dataset_id: &str,
        learner_id: &str,
        fragments: Vec<MemoryFragment>,
    ) -> Self {
        self.memory.insert(key(dataset_id, learner_id), fragments);
        self
    }

    pub fn with_embeddings(
        mut self,
        dataset_id: &str,
        learner_id: &str,
        pool: Pool,
        kind: EmbeddingKind,
        entries: Vec<StoredEmbedding>,
    ) -> Self {
        self.embeddings.insert(
            (dataset_id.to_string(), learner_id.to_string(), pool, kind),
            EmbeddingSet::from_entries(entries),
        );
        self
    }
}

#[async_trait]
impl FragmentStore for InMemoryFragmentStore {
    async fn persona_fragments(
        &self,
        dataset_id: &str,
        learner_id: &str,
    ) -> RecollectResult<Vec<PersonaFragment>> {
        self.persona
            .get(&key(dataset_id, learner_id))
            .cloned()
            .ok_or_else(|| missing(dataset_id, learner_id, "persona"))
    }

    async fn memory_fragments(
        &self,
        dataset_id: &str,
        learner_id: &str,
    ) -> RecollectResult<Vec<MemoryFragment>> {
        self.memory
            .get(&key(dataset_id, learner_id))
            .cloned()
            .ok_or_else(|| missing(dataset_id, learner_id, "memory"))
    }

    async fn embeddings(
        &self,
        dataset_id: &str,
        learner_id: &str,
        pool: Pool,
        kind: EmbeddingKind,
    ) -> RecollectResult<EmbeddingSet> {
        self.embeddings
            .get(&(dataset_id.to_string(), learner_id.to_string(), pool, kind))
            .cloned()
            .ok_or_else(|| missing(dataset_id, learner_id, &format!("embeddings/{}_{}", pool, kind)))
    }
}
