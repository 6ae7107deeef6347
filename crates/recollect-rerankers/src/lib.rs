//! recollect-rerankers - Cross-encoder reranker implementations for recollect.
//!
//! Every backend scores a whole shortlist against the query in one call and
//! returns the scores in input order. Ordering and top-N selection happen in
//! `recollect_core::retrieval::RerankAdapter`.
//!
//! # Supported Backends
//!
//! - **Cohere** (feature: `cohere`) - Cohere Rerank API
//! - **Cross-encoder** (feature: `cross-encoder`) - self-hosted `/rerank` endpoint (e.g. bge-reranker behind text-embeddings-inference)
//! - **LLM** (feature: `llm`) - any [`recollect_core::traits::Llm`] used as a relevance judge

mod factory;
mod scores;

#[cfg(feature = "cohere")]
mod cohere;

#[cfg(feature = "cross-encoder")]
mod cross_encoder;

#[cfg(feature = "llm")]
mod llm_reranker;

pub use factory::RerankerFactory;

#[cfg(feature = "cohere")]
pub use cohere::CohereReranker;

#[cfg(feature = "cross-encoder")]
pub use cross_encoder::CrossEncoderReranker;

#[cfg(feature = "llm")]
pub use llm_reranker::LlmReranker;

// Re-export core types
pub use recollect_core::traits::{Reranker, RerankerConfig, RerankerProvider};
