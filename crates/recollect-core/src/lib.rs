//! recollect-core - Core library for recollect.
//!
//! This crate provides the traits, data model, forgetting estimator and
//! retrieval orchestrator for forgetting-aware tutoring memory.
//!
//! # Example
//!
//! ```ignore
//! use recollect_core::{ForgettingEngine, RetrievalEngine, RetrievalRequest};
//!
//! let engine = RetrievalEngine::new(embedder, store, config.retrieval)?.with_reranker(reranker);
//! let result = engine
//!     .retrieve(&RetrievalRequest::new("s42", "assist09", "Fractions", "how do I add 1/2 and 1/3?"))
//!     .await?;
//!
//! let forgetting = ForgettingEngine::new(corpus, config.forgetting)?
//!     .with_source(Arc::new(HistoryMastery::new()));
//! let record = forgetting.estimate_forgetting("s42", "fractions", &MasterySource::History).await?;
//! ```

pub mod config;
pub mod error;
pub mod forgetting;
pub mod mastery;
pub mod retrieval;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{RecollectConfig, StoreConfig};
pub use error::{RecollectError, RecollectResult};
pub use forgetting::{ForgettingConfig, ForgettingEngine, ForgettingEstimator, SourceRecords};
pub use mastery::{HistoryMastery, LlmMastery, PredictionTable};
pub use retrieval::{BatchRetriever, RetrievalConfig, RetrievalEngine};
pub use store::{FragmentStore, InMemoryFragmentStore, JsonFragmentStore};
pub use traits::{Embedder, EmbedderConfig, Llm, LlmConfig, MasteryEstimator, Reranker, RerankerConfig};
pub use types::{
    ForgettingLevel, ForgettingRecord, Interaction, InteractionCorpus, MasterySource,
    MemoryFragment, PersonaFragment, RankingStage, RetrievalRequest, RetrievalResult,
};
