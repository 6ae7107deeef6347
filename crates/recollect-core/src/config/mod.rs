//! Configuration system for recollect.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{RecollectError, RecollectResult};
use crate::forgetting::ForgettingConfig;
use crate::retrieval::RetrievalConfig;
use crate::traits::{
    EmbedderConfig, EmbedderProvider, LlmConfig, LlmProvider, RerankerConfig, RerankerProvider,
};

/// LLM provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            config: LlmConfig {
                model: "gpt-4.1-nano-2025-04-14".to_string(),
                ..Default::default()
            },
        }
    }
}

/// Embedder provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderProviderConfig {
    /// Provider type.
    pub provider: EmbedderProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: EmbedderConfig,
}

impl Default for EmbedderProviderConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderProvider::OpenAI,
            config: EmbedderConfig::default(),
        }
    }
}

/// Fragment bank location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory holding one sub-directory per dataset.
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let recollect_dir = dirs::home_dir()
            .map(|h| h.join(".recollect"))
            .unwrap_or_else(|| PathBuf::from(".recollect"));
        Self {
            root: recollect_dir.join("banks"),
        }
    }
}

/// Main recollect configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecollectConfig {
    /// Query encoder.
    pub embedder: EmbedderProviderConfig,
    /// Cross-encoder (optional; without one results stay in fused order).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranker: Option<RerankerConfig>,
    /// LLM backend for LLM mastery judging and LLM reranking (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmProviderConfig>,
    /// Retrieval parameters.
    pub retrieval: RetrievalConfig,
    /// Forgetting estimator parameters.
    pub forgetting: ForgettingConfig,
    /// Fragment bank store.
    pub store: StoreConfig,
}

impl RecollectConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> RecollectResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RecollectError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RecollectError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RecollectError::Configuration(e.to_string()))?,
            _ => {
                return Err(RecollectError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `RECOLLECT_*` environment variables.
    pub fn from_env() -> RecollectResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from a variable lookup, starting from defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> RecollectResult<Self> {
        let mut config = Self::default();

        // Embedder
        if let Some(provider) = var("RECOLLECT_EMBEDDER_PROVIDER") {
            config.embedder.provider = match provider.to_lowercase().as_str() {
                "openai" => EmbedderProvider::OpenAI,
                "ollama" => EmbedderProvider::Ollama,
                _ => return Err(RecollectError::UnsupportedProvider { provider }),
            };
        }
        if let Some(model) = var("RECOLLECT_EMBEDDER_MODEL") {
            config.embedder.config.model = model;
        }
        if let Some(dims) = var("RECOLLECT_EMBEDDING_DIMS") {
            config.embedder.config.embedding_dims = parse_var("RECOLLECT_EMBEDDING_DIMS", &dims)?;
        }
        if let Some(url) = var("RECOLLECT_EMBEDDER_URL") {
            config.embedder.config.base_url = Some(url);
        }
        if let Some(api_key) = var("OPENAI_API_KEY") {
            config.embedder.config.api_key = Some(api_key);
        }

        // Reranker
        if let Some(provider) = var("RECOLLECT_RERANKER_PROVIDER") {
            let provider = match provider.to_lowercase().as_str() {
                "cohere" => RerankerProvider::Cohere,
                "cross_encoder" | "cross-encoder" | "tei" => RerankerProvider::CrossEncoder,
                "llm" => RerankerProvider::Llm,
                _ => return Err(RecollectError::UnsupportedProvider { provider }),
            };
            let reranker = config.reranker.get_or_insert_with(RerankerConfig::default);
            reranker.provider = provider;
            if provider == RerankerProvider::Cohere {
                reranker.api_key = var("COHERE_API_KEY");
            }
        }
        if let Some(reranker) = config.reranker.as_mut() {
            if let Some(model) = var("RECOLLECT_RERANKER_MODEL") {
                reranker.model = model;
            }
            if let Some(url) = var("RECOLLECT_RERANKER_URL") {
                reranker.base_url = Some(url);
            }
        }

        // LLM
        if let Some(provider) = var("RECOLLECT_LLM_PROVIDER") {
            let provider = match provider.to_lowercase().as_str() {
                "openai" => LlmProvider::OpenAI,
                "anthropic" => LlmProvider::Anthropic,
                _ => return Err(RecollectError::UnsupportedProvider { provider }),
            };
            let llm = config.llm.get_or_insert_with(LlmProviderConfig::default);
            llm.provider = provider;
            llm.config.api_key = match provider {
                LlmProvider::OpenAI => var("OPENAI_API_KEY"),
                LlmProvider::Anthropic => var("ANTHROPIC_API_KEY"),
            };
        }
        if let Some(llm) = config.llm.as_mut() {
            if let Some(model) = var("RECOLLECT_LLM_MODEL") {
                llm.config.model = model;
            }
            if let Some(url) = var("RECOLLECT_LLM_URL") {
                llm.config.base_url = Some(url);
            }
        }

        // Retrieval
        if let Some(v) = var("RECOLLECT_LAMBDA") {
            config.retrieval.lambda = parse_var("RECOLLECT_LAMBDA", &v)?;
        }
        if let Some(v) = var("RECOLLECT_TOP_K") {
            config.retrieval.top_k = parse_var("RECOLLECT_TOP_K", &v)?;
        }
        if let Some(v) = var("RECOLLECT_TOP_N") {
            config.retrieval.top_n = parse_var("RECOLLECT_TOP_N", &v)?;
        }
        if let Some(v) = var("RECOLLECT_MAX_CONCURRENCY") {
            config.retrieval.max_concurrency = parse_var("RECOLLECT_MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = var("RECOLLECT_ENCODER_TIMEOUT_MS") {
            config.retrieval.encoder_timeout_ms = parse_var("RECOLLECT_ENCODER_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("RECOLLECT_RERANKER_TIMEOUT_MS") {
            config.retrieval.reranker_timeout_ms = parse_var("RECOLLECT_RERANKER_TIMEOUT_MS", &v)?;
        }

        // Forgetting
        if let Some(v) = var("RECOLLECT_TAU") {
            config.forgetting.tau_override = Some(parse_var("RECOLLECT_TAU", &v)?);
        }

        // Store
        if let Some(root) = var("RECOLLECT_STORE_ROOT") {
            config.store.root = PathBuf::from(root);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> RecollectResult<()> {
        if self.embedder.config.embedding_dims == 0 {
            return Err(RecollectError::out_of_range("embedding_dims", 0, "at least 1"));
        }
        self.retrieval.validate()?;
        self.forgetting.validate()?;
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> RecollectConfigBuilder {
        RecollectConfigBuilder::default()
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> RecollectResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RecollectError::Configuration(format!("{}={}: {}", key, value, e)))
}

/// Builder for RecollectConfig.
#[derive(Default)]
pub struct RecollectConfigBuilder {
    config: RecollectConfig,
}

impl RecollectConfigBuilder {
    /// Set embedder configuration.
    pub fn embedder(mut self, config: EmbedderProviderConfig) -> Self {
        self.config.embedder = config;
        self
    }

    /// Set reranker configuration.
    pub fn reranker(mut self, config: RerankerConfig) -> Self {
        self.config.reranker = Some(config);
        self
    }

    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.llm = Some(config);
        self
    }

    /// Set retrieval parameters.
    pub fn retrieval(mut self, config: RetrievalConfig) -> Self {
        self.config.retrieval = config;
        self
    }

    /// Set forgetting parameters.
    pub fn forgetting(mut self, config: ForgettingConfig) -> Self {
        self.config.forgetting = config;
        self
    }

    /// Set the fragment bank root.
    pub fn store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.store.root = root.into();
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> RecollectResult<RecollectConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RecollectConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.reranker.is_none());
        assert!(config.store.root.ends_with("banks"));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[embedder]
provider = "ollama"
model = "nomic-embed-text"
embedding_dims = 768

[reranker]
provider = "cross_encoder"
model = "bge-reranker-base"
base_url = "http://localhost:8080"

[retrieval]
lambda = 0.7
top_n = 5

[forgetting]
tau_override = 30.0
"#
        )
        .unwrap();

        let config = RecollectConfig::from_file(file.path()).unwrap();
        assert_eq!(config.embedder.provider, EmbedderProvider::Ollama);
        assert_eq!(config.embedder.config.embedding_dims, 768);
        let reranker = config.reranker.unwrap();
        assert_eq!(reranker.provider, RerankerProvider::CrossEncoder);
        assert_eq!(config.retrieval.lambda, 0.7);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.top_n, 5);
        assert_eq!(config.forgetting.tau_override, Some(30.0));
    }

    #[test]
    fn test_from_yaml_file_is_validated() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "retrieval:\n  top_k: 2\n  top_n: 3\n").unwrap();
        let err = RecollectConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RecollectError::Validation { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            RecollectConfig::from_file(file.path()),
            Err(RecollectError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_vars() {
        let config = RecollectConfig::from_vars(vars(&[
            ("RECOLLECT_RERANKER_PROVIDER", "cohere"),
            ("COHERE_API_KEY", "co-key"),
            ("RECOLLECT_LLM_PROVIDER", "anthropic"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("RECOLLECT_LAMBDA", "0.25"),
            ("RECOLLECT_TAU", "90"),
            ("RECOLLECT_STORE_ROOT", "/data/banks"),
        ]))
        .unwrap();

        let reranker = config.reranker.unwrap();
        assert_eq!(reranker.provider, RerankerProvider::Cohere);
        assert_eq!(reranker.api_key.as_deref(), Some("co-key"));
        let llm = config.llm.unwrap();
        assert_eq!(llm.provider, LlmProvider::Anthropic);
        assert_eq!(llm.config.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(config.retrieval.lambda, 0.25);
        assert_eq!(config.forgetting.tau_override, Some(90.0));
        assert_eq!(config.store.root, PathBuf::from("/data/banks"));
    }

    #[test]
    fn test_from_vars_rejects_bad_values() {
        assert!(matches!(
            RecollectConfig::from_vars(vars(&[("RECOLLECT_TOP_K", "ten")])),
            Err(RecollectError::Configuration(_))
        ));
        assert!(matches!(
            RecollectConfig::from_vars(vars(&[("RECOLLECT_EMBEDDER_PROVIDER", "word2vec")])),
            Err(RecollectError::UnsupportedProvider { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let config = RecollectConfig::builder()
            .store_root("/tmp/banks")
            .forgetting(ForgettingConfig::default().with_tau_override(15.0))
            .build()
            .unwrap();
        assert_eq!(config.store.root, PathBuf::from("/tmp/banks"));
        assert_eq!(config.forgetting.tau_override, Some(15.0));
    }
}
