//! Core traits for recollect providers.

mod embedder;
mod llm;
mod mastery;
mod reranker;

pub use embedder::*;
pub use llm::*;
pub use mastery::*;
pub use reranker::*;
