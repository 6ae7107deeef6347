//! Builds engines from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};

use recollect_core::traits::{Llm, Reranker};
use recollect_core::{JsonFragmentStore, RecollectConfig, RetrievalEngine};
use recollect_embeddings::EmbedderFactory;
use recollect_llm::LlmFactory;
use recollect_rerankers::RerankerFactory;

/// The configured LLM, if any.
pub fn llm(config: &RecollectConfig) -> Result<Option<Arc<dyn Llm>>> {
    config
        .llm
        .as_ref()
        .map(|llm| LlmFactory::from_config(llm).context("failed to create LLM"))
        .transpose()
}

/// Retrieval engine over the JSON fragment bank at `store.root`.
pub fn retrieval_engine(config: &RecollectConfig) -> Result<RetrievalEngine> {
    let embedder =
        EmbedderFactory::from_config(&config.embedder).context("failed to create query encoder")?;
    let store = Arc::new(JsonFragmentStore::new(config.store.root.clone()));

    let mut engine = RetrievalEngine::new(embedder, store, config.retrieval.clone())?;
    match &config.reranker {
        Some(reranker) => {
            let reranker = RerankerFactory::create(reranker.clone(), llm(config)?)
                .context("failed to create reranker")?;
            tracing::info!(model = reranker.model_name(), "Reranker enabled");
            engine = engine.with_reranker(reranker);
        }
        None => tracing::info!("No reranker configured; results stay in fused order"),
    }

    tracing::info!(
        encoder = config.embedder.config.model.as_str(),
        root = %config.store.root.display(),
        "Retrieval engine ready"
    );
    Ok(engine)
}
