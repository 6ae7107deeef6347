//! Persona and memory retrieval.
//!
//! Query embedding, description/keyword similarity fusion to a top-K
//! shortlist per pool, and cross-encoder reranking to top-N.

mod batch;
mod config;
mod engine;
mod fusion;
mod rerank;
mod similarity;

pub use batch::BatchRetriever;
pub use config::{RankingParams, RetrievalConfig};
pub use engine::{RetrievalEngine, RERANKER_NOT_CONFIGURED};
pub use fusion::{Candidate, SimilarityFusion};
pub use rerank::{RerankAdapter, RerankDocument};
pub use similarity::cosine_similarity;
