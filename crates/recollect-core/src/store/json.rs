//! JSON file fragment store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::FragmentStore;
use crate::error::{RecollectError, RecollectResult};
use crate::types::{
    EmbeddingKind, EmbeddingSet, MemoryFragment, PersonaFragment, Pool, StoredEmbedding,
};

/// Reads fragment banks laid out as
///
/// ```text
/// <root>/<dataset>/persona/<learner>.json
/// <root>/<dataset>/memory/<learner>.json
/// <root>/<dataset>/embeddings/<pool>_<kind>/<learner>.json
/// ```
///
/// Fragment files hold a JSON array of fragments; embedding sidecars hold a
/// JSON array of `{ "index", "text_hash", "vector" }` entries.
#[derive(Debug, Clone)]
pub struct JsonFragmentStore {
    root: PathBuf,
}

impl JsonFragmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn persona_path(&self, dataset_id: &str, learner_id: &str) -> RecollectResult<PathBuf> {
        Ok(self
            .dataset_dir(dataset_id)?
            .join("persona")
            .join(file_name(learner_id)?))
    }

    pub fn memory_path(&self, dataset_id: &str, learner_id: &str) -> RecollectResult<PathBuf> {
        Ok(self
            .dataset_dir(dataset_id)?
            .join("memory")
            .join(file_name(learner_id)?))
    }

    pub fn embeddings_path(
        &self,
        dataset_id: &str,
        learner_id: &str,
        pool: Pool,
        kind: EmbeddingKind,
    ) -> RecollectResult<PathBuf> {
        Ok(self
            .dataset_dir(dataset_id)?
            .join("embeddings")
            .join(format!("{}_{}", pool, kind))
            .join(file_name(learner_id)?))
    }

    fn dataset_dir(&self, dataset_id: &str) -> RecollectResult<PathBuf> {
        check_segment("dataset_id", dataset_id)?;
        Ok(self.root.join(dataset_id))
    }
}

fn check_segment(field: &str, value: &str) -> RecollectResult<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
    {
        return Err(RecollectError::validation(format!(
            "{} '{}' is not usable as a file name",
            field, value
        )));
    }
    Ok(())
}

fn file_name(learner_id: &str) -> RecollectResult<String> {
    check_segment("learner_id", learner_id)?;
    Ok(format!("{}.json", learner_id))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> RecollectResult<T> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RecollectError::missing_file(path));
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map_err(|e| RecollectError::parse(format!("{}: {}", path.display(), e)))
}

#[async_trait]
impl FragmentStore for JsonFragmentStore {
    async fn persona_fragments(
        &self,
        dataset_id: &str,
        learner_id: &str,
    ) -> RecollectResult<Vec<PersonaFragment>> {
        read_json(&self.persona_path(dataset_id, learner_id)?).await
    }

    async fn memory_fragments(
        &self,
        dataset_id: &str,
        learner_id: &str,
    ) -> RecollectResult<Vec<MemoryFragment>> {
        read_json(&self.memory_path(dataset_id, learner_id)?).await
    }

    async fn embeddings(
        &self,
        dataset_id: &str,
        learner_id: &str,
        pool: Pool,
        kind: EmbeddingKind,
    ) -> RecollectResult<EmbeddingSet> {
        let path = self.embeddings_path(dataset_id, learner_id, pool, kind)?;
        let entries: Vec<StoredEmbedding> = read_json(&path).await?;
        Ok(EmbeddingSet::from_entries(entries))
    }
}
