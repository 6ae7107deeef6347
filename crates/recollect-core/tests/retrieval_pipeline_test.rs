//! Integration tests for retrieval over a JSON fragment bank on disk.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use recollect_core::store::FragmentStore;
use recollect_core::types::{text_hash, EmbeddingKind, Pool, StoredEmbedding};
use recollect_core::{
    BatchRetriever, Embedder, JsonFragmentStore, RankingStage, RecollectError, RecollectResult,
    Reranker, RetrievalConfig, RetrievalEngine, RetrievalRequest,
};
use serde_json::json;

/// Maps each query to a fixed direction in a 3-d space.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> RecollectResult<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(vec![
            if text.contains("add") { 1.0 } else { 0.0 },
            if text.contains("simplify") { 1.0 } else { 0.0 },
            0.1,
        ])
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

struct DownReranker;

#[async_trait]
impl Reranker for DownReranker {
    async fn score(&self, _query: &str, _documents: &[String]) -> RecollectResult<Vec<f32>> {
        Err(RecollectError::reranker("connection reset"))
    }

    fn model_name(&self) -> &str {
        "down"
    }
}

fn write_json(path: &Path, value: serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn embedding_entries(texts: &[(&str, [f32; 3])]) -> serde_json::Value {
    let entries: Vec<StoredEmbedding> = texts
        .iter()
        .enumerate()
        .map(|(i, (text, v))| StoredEmbedding::for_text(i, text, v.to_vec()))
        .collect();
    serde_json::to_value(entries).unwrap()
}

/// Learner s1 has both pools; learner s2 only has memory records.
fn seed_bank(store: &JsonFragmentStore) {
    let persona = [
        ("adds fractions with unlike denominators after prompting", "addition unlike denominators"),
        ("rarely simplifies final answers", "simplification"),
    ];
    write_json(
        &store.persona_path("assist", "s1").unwrap(),
        json!([
            {"concept_id": 7, "concept": "Fractions", "description": persona[0].0, "keywords": persona[0].1, "correct": 4, "total": 6},
            {"concept_id": 7, "concept": "Fractions", "description": persona[1].0, "keywords": persona[1].1, "correct": 1, "total": 3}
        ]),
    );
    write_json(
        &store
            .embeddings_path("assist", "s1", Pool::Persona, EmbeddingKind::Description)
            .unwrap(),
        embedding_entries(&[(persona[0].0, [1.0, 0.0, 0.0]), (persona[1].0, [0.0, 1.0, 0.0])]),
    );
    write_json(
        &store
            .embeddings_path("assist", "s1", Pool::Persona, EmbeddingKind::Keywords)
            .unwrap(),
        embedding_entries(&[(persona[0].1, [0.9, 0.1, 0.0]), (persona[1].1, [0.1, 0.9, 0.0])]),
    );

    for learner in ["s1", "s2"] {
        let memory = [
            "added 1/4 and 1/2 correctly",
            "forgot to find a common denominator",
            "converted 0.25 to a percent",
        ];
        write_json(
            &store.memory_path("assist", learner).unwrap(),
            json!([
                {"concept_id": 7, "concept": "Fractions", "description": memory[0], "timestamp": 1700000000, "correct": 1},
                {"concept_id": 7, "concept": "Fractions", "description": memory[1], "keywords": "common denominator", "timestamp": 1700000300, "correct": 0},
                {"concept_id": 9, "concept": "Percents", "description": memory[2], "timestamp": 1700000600, "correct": 1}
            ]),
        );
        write_json(
            &store
                .embeddings_path("assist", learner, Pool::Memory, EmbeddingKind::Description)
                .unwrap(),
            embedding_entries(&[
                (memory[0], [1.0, 0.0, 0.0]),
                (memory[1], [0.6, 0.0, 0.8]),
                (memory[2], [0.0, 0.0, 1.0]),
            ]),
        );
    }
}

fn engine(root: &Path) -> RetrievalEngine {
    RetrievalEngine::new(
        Arc::new(KeywordEmbedder),
        Arc::new(JsonFragmentStore::new(root)),
        RetrievalConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_retrieves_both_pools_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    seed_bank(&JsonFragmentStore::new(dir.path()));

    let result = engine(dir.path())
        .retrieve(&RetrievalRequest::new("s1", "assist", "fractions", "How do I add fractions?"))
        .await
        .unwrap();

    assert_eq!(result.persona.len(), 2);
    assert_eq!(result.persona[0].index, 0);
    assert_eq!(result.persona[0].fragment.accuracy(), Some(4.0 / 6.0));

    // The percents record is filtered out before scoring.
    let memory: Vec<usize> = result.memory.iter().map(|s| s.index).collect();
    assert_eq!(memory, vec![0, 1]);
    assert_eq!(result.dropped, 0);
}

#[tokio::test]
async fn test_learner_without_persona_file() {
    let dir = tempfile::tempdir().unwrap();
    seed_bank(&JsonFragmentStore::new(dir.path()));

    let result = engine(dir.path())
        .retrieve(&RetrievalRequest::new("s2", "assist", "Fractions", "add these"))
        .await
        .unwrap();

    assert!(result.persona.is_empty());
    assert!(!result.memory.is_empty());
}

#[tokio::test]
async fn test_reranker_outage_keeps_fused_order() {
    let dir = tempfile::tempdir().unwrap();
    seed_bank(&JsonFragmentStore::new(dir.path()));

    let engine = engine(dir.path()).with_reranker(Arc::new(DownReranker));
    let result = engine
        .retrieve(&RetrievalRequest::new("s1", "assist", "Fractions", "simplify my answer").with_top_n(1))
        .await
        .unwrap();

    assert!(matches!(result.stage, RankingStage::Fused { .. }));
    assert_eq!(result.persona.len(), 1);
    assert_eq!(result.persona[0].index, 1);
    assert_eq!(result.memory.len(), 1);
    assert!(result.persona[0].rerank_score.is_none());
    assert!(result.memory[0].rerank_score.is_none());
}

#[tokio::test]
async fn test_edited_description_invalidates_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFragmentStore::new(dir.path());
    seed_bank(&store);

    // Rewrite one memory description without regenerating embeddings.
    let path = store.memory_path("assist", "s1").unwrap();
    let mut fragments: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    fragments[0]["description"] = json!("added 1/4 and 1/2 after two tries");
    write_json(&path, fragments);

    let sets = store
        .embeddings("assist", "s1", Pool::Memory, EmbeddingKind::Description)
        .await
        .unwrap();
    assert_ne!(
        sets.get(0).unwrap().text_hash,
        text_hash("added 1/4 and 1/2 after two tries")
    );

    let result = engine(dir.path())
        .retrieve(&RetrievalRequest::new("s1", "assist", "Fractions", "add"))
        .await
        .unwrap();
    let memory: Vec<usize> = result.memory.iter().map(|s| s.index).collect();
    assert_eq!(memory, vec![1]);
    assert_eq!(result.dropped, 1);
}

#[tokio::test]
async fn test_corrupt_fragment_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFragmentStore::new(dir.path());
    let path = store.persona_path("assist", "s3").unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[{\"concept\": ").unwrap();

    let err = engine(dir.path())
        .retrieve(&RetrievalRequest::new("s3", "assist", "Fractions", "add"))
        .await
        .unwrap_err();
    assert!(matches!(err, RecollectError::Parse { .. }));
}

#[tokio::test]
async fn test_batch_over_learners() {
    let dir = tempfile::tempdir().unwrap();
    seed_bank(&JsonFragmentStore::new(dir.path()));

    let batch = BatchRetriever::new(Arc::new(engine(dir.path())));
    let results = batch
        .retrieve_all(vec![
            RetrievalRequest::new("s1", "assist", "Fractions", "add"),
            RetrievalRequest::new("s2", "assist", "Fractions", "add"),
            RetrievalRequest::new("s1", "assist", "Fractions", "add").with_lambda(3.0),
        ])
        .await;

    assert_eq!(results[0].as_ref().unwrap().persona.len(), 2);
    assert!(results[1].as_ref().unwrap().persona.is_empty());
    assert!(matches!(results[2], Err(RecollectError::Validation { .. })));
}
