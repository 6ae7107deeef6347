//! LLM completion trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecollectResult;
use crate::types::Message;

/// Per-call generation options.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    /// Deterministic, short completions for scoring prompts.
    pub fn scoring() -> Self {
        Self {
            temperature: Some(0.0),
            max_tokens: Some(256),
        }
    }
}

/// Text completion backend - every LLM provider implements this once.
///
/// Callers never branch on which backend serves them.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Complete a conversation and return the generated text.
    async fn complete(
        &self,
        messages: &[Message],
        options: Option<CompletionOptions>,
    ) -> RecollectResult<String>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/identifier.
    pub model: String,
    /// Default sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Default maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key (if not using environment variable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key: None,
            base_url: None,
        }
    }
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Any server speaking the OpenAI chat completions protocol.
    #[default]
    OpenAI,
    Anthropic,
}
