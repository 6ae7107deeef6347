//! Error types for recollect operations.
//!
//! Errors fall into two groups. Data-availability gaps (missing fragment files,
//! missing or stale embeddings, reranker outages) are absorbed by the retrieval
//! pipeline and only logged. External encoder failures and invalid input abort
//! the request and surface to the caller.

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for recollect operations.
pub type RecollectResult<T> = Result<T, RecollectError>;

/// Main error type for all recollect operations.
#[derive(Error, Debug)]
pub enum RecollectError {
    /// Too few attempts to compute an elapsed time for a learner-concept pair.
    #[error("Insufficient history for learner '{learner_id}' on concept '{concept_id}': {attempts} attempt(s), need at least 2")]
    InsufficientHistory {
        learner_id: String,
        concept_id: String,
        attempts: usize,
    },

    /// A mastery source has no estimate for the requested pair.
    #[error("Mastery unavailable from source '{source_id}': {message}")]
    MasteryUnavailable {
        source_id: String,
        message: String,
        code: ErrorCode,
    },

    /// A persona or memory file does not exist for the learner.
    #[error("Fragment file not found: {}", path.display())]
    MissingFragmentFile { path: PathBuf },

    /// A fragment has no usable embedding.
    #[error("Missing embedding: {message}")]
    MissingEmbedding {
        message: String,
        fragment_index: Option<usize>,
    },

    /// The query encoder failed or timed out.
    #[error("Encoder unavailable: {message}")]
    EncoderUnavailable {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The cross-encoder reranker failed or timed out.
    #[error("Reranker unavailable: {message}")]
    RerankerUnavailable {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM completion failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Forgetting (FGT_xxx)
    FgtInsufficientHistory,
    FgtMasteryUnavailable,

    // Store (STO_xxx)
    StoMissingFile,
    StoMissingEmbedding,

    // Retrieval services (RET_xxx)
    RetEncoderFailed,
    RetEncoderTimeout,
    RetRerankerFailed,
    RetRerankerTimeout,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValOutOfRange,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FgtInsufficientHistory => "FGT_001",
            ErrorCode::FgtMasteryUnavailable => "FGT_002",
            ErrorCode::StoMissingFile => "STO_001",
            ErrorCode::StoMissingEmbedding => "STO_002",
            ErrorCode::RetEncoderFailed => "RET_001",
            ErrorCode::RetEncoderTimeout => "RET_002",
            ErrorCode::RetRerankerFailed => "RET_003",
            ErrorCode::RetRerankerTimeout => "RET_004",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValOutOfRange => "VAL_002",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl RecollectError {
    /// Create an insufficient history error.
    pub fn insufficient_history(
        learner_id: impl Into<String>,
        concept_id: impl Into<String>,
        attempts: usize,
    ) -> Self {
        Self::InsufficientHistory {
            learner_id: learner_id.into(),
            concept_id: concept_id.into(),
            attempts,
        }
    }

    /// Create a mastery unavailable error.
    pub fn mastery_unavailable(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MasteryUnavailable {
            source_id: source_id.into(),
            message: message.into(),
            code: ErrorCode::FgtMasteryUnavailable,
        }
    }

    /// Create a missing fragment file error.
    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFragmentFile { path: path.into() }
    }

    /// Create a missing embedding error.
    pub fn missing_embedding(message: impl Into<String>, fragment_index: Option<usize>) -> Self {
        Self::MissingEmbedding {
            message: message.into(),
            fragment_index,
        }
    }

    /// Create an encoder error.
    pub fn encoder(message: impl Into<String>) -> Self {
        Self::EncoderUnavailable {
            message: message.into(),
            code: ErrorCode::RetEncoderFailed,
            source: None,
        }
    }

    /// Create an encoder timeout error.
    pub fn encoder_timeout(timeout_ms: u64) -> Self {
        Self::EncoderUnavailable {
            message: format!("query encoding exceeded {}ms", timeout_ms),
            code: ErrorCode::RetEncoderTimeout,
            source: None,
        }
    }

    /// Create a reranker error.
    pub fn reranker(message: impl Into<String>) -> Self {
        Self::RerankerUnavailable {
            message: message.into(),
            code: ErrorCode::RetRerankerFailed,
            source: None,
        }
    }

    /// Create a reranker timeout error.
    pub fn reranker_timeout(timeout_ms: u64) -> Self {
        Self::RerankerUnavailable {
            message: format!("cross-encoder scoring exceeded {}ms", timeout_ms),
            code: ErrorCode::RetRerankerTimeout,
            source: None,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create an out-of-range validation error for a named field.
    pub fn out_of_range(field: &str, value: impl std::fmt::Display, expected: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        details.insert("value".to_string(), value.to_string());
        Self::Validation {
            message: format!("{} = {} is out of range", field, value),
            code: ErrorCode::ValOutOfRange,
            details,
            suggestion: Some(format!("{} must be {}", field, expected)),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InsufficientHistory { .. } => ErrorCode::FgtInsufficientHistory,
            Self::MasteryUnavailable { code, .. } => *code,
            Self::MissingFragmentFile { .. } => ErrorCode::StoMissingFile,
            Self::MissingEmbedding { .. } => ErrorCode::StoMissingEmbedding,
            Self::EncoderUnavailable { code, .. } => *code,
            Self::RerankerUnavailable { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the retrieval pipeline absorbs this error instead of failing the request.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::MissingFragmentFile { .. }
                | Self::MissingEmbedding { .. }
                | Self::RerankerUnavailable { .. }
        )
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::InsufficientHistory { .. } => {
                Some("A concept needs at least two attempts before decay can be estimated")
            }
            Self::EncoderUnavailable { .. } => {
                Some("Please check your embedding provider configuration and timeout")
            }
            Self::RerankerUnavailable { .. } => {
                Some("Results fall back to fused similarity order; check the reranker service")
            }
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// Convert from HTTP status code returned by a provider API.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 | 422 => Self::Validation {
                message: body.to_string(),
                code: ErrorCode::ValInvalidInput,
                details: HashMap::new(),
                suggestion: Some("Please check your request parameters".to_string()),
            },
            408 | 504 => Self::Network {
                message: body.to_string(),
                code: ErrorCode::NetTimeout,
                source: None,
            },
            _ => Self::Network {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::NetConnectionFailed,
                source: None,
            },
        }
    }
}
