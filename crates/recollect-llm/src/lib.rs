//! recollect-llm - LLM provider implementations for recollect.
//!
//! LLMs serve two roles in recollect: as a mastery judge for the forgetting
//! estimator and as a relevance judge when no cross-encoder is deployed.
//! Both go through the single [`Llm::complete`] call.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - GPT-4.1, GPT-4o, and any server speaking the chat completions protocol
//! - **Anthropic** (feature: `anthropic`) - Claude models via the messages API
//!
//! # Example
//!
//! ```ignore
//! use recollect_llm::LlmFactory;
//!
//! let llm = LlmFactory::openai_with_model("gpt-4.1-mini")?;
//! let llm = LlmFactory::anthropic_with_model("claude-3-5-haiku-latest")?;
//! ```

mod anthropic;
mod factory;
mod openai;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use recollect_core::traits::{CompletionOptions, Llm, LlmConfig, LlmProvider};
