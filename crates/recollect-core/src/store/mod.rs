//! Fragment and embedding stores.
//!
//! Persona and memory fragments are authored upstream. The engine only
//! reads them, together with the sidecar embeddings computed from their text.

mod json;
mod memory;

use async_trait::async_trait;

use crate::error::RecollectResult;
use crate::types::{EmbeddingKind, EmbeddingSet, MemoryFragment, PersonaFragment, Pool};

pub use json::JsonFragmentStore;
pub use memory::InMemoryFragmentStore;

/// Read-only access to a learner's fragment banks.
///
/// Every method returns `MissingFragmentFile` when the learner has no such
/// file; callers decide whether absence degrades or fails.
#[async_trait]
pub trait FragmentStore: Send + Sync {
    /// Long-term persona fragments, in file order.
    async fn persona_fragments(
        &self,
        dataset_id: &str,
        learner_id: &str,
    ) -> RecollectResult<Vec<PersonaFragment>>;

    /// Episodic memory fragments for every concept, in file order.
    async fn memory_fragments(
        &self,
        dataset_id: &str,
        learner_id: &str,
    ) -> RecollectResult<Vec<MemoryFragment>>;

    /// Embeddings of one kind for one pool, keyed by fragment index.
    async fn embeddings(
        &self,
        dataset_id: &str,
        learner_id: &str,
        pool: Pool,
        kind: EmbeddingKind,
    ) -> RecollectResult<EmbeddingSet>;
}
