//! Forgetting record types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::RecollectError;

/// Identity of a mastery-estimate source.
///
/// Serialized as `history`, `kt:<model>` or `llm:<model>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MasterySource {
    /// Mean correctness of the learner's prior attempts.
    History,
    /// Predictions of a trained knowledge-tracing model.
    KnowledgeTracing(String),
    /// Probabilities judged by a language model.
    Llm(String),
}

impl MasterySource {
    pub fn knowledge_tracing(model: impl Into<String>) -> Self {
        Self::KnowledgeTracing(model.into())
    }

    pub fn llm(model: impl Into<String>) -> Self {
        Self::Llm(model.into())
    }
}

impl fmt::Display for MasterySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::History => write!(f, "history"),
            Self::KnowledgeTracing(model) => write!(f, "kt:{}", model),
            Self::Llm(model) => write!(f, "llm:{}", model),
        }
    }
}

impl FromStr for MasterySource {
    type Err = RecollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "history" {
            return Ok(Self::History);
        }
        match s.split_once(':') {
            Some(("kt", model)) if !model.is_empty() => Ok(Self::KnowledgeTracing(model.to_string())),
            Some(("llm", model)) if !model.is_empty() => Ok(Self::Llm(model.to_string())),
            _ => Err(RecollectError::validation(format!(
                "unknown mastery source '{}', expected history, kt:<model> or llm:<model>",
                s
            ))),
        }
    }
}

impl From<MasterySource> for String {
    fn from(source: MasterySource) -> Self {
        source.to_string()
    }
}

impl TryFrom<String> for MasterySource {
    type Error = RecollectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Population-relative forgetting level within one mastery source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForgettingLevel {
    Low,
    Medium,
    High,
}

/// Estimated knowledge decay for one learner-concept pair under one source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForgettingRecord {
    pub learner_id: String,
    pub concept_id: String,
    pub source: MasterySource,
    /// Mastery estimate before the most recent attempt, in [0, 1].
    pub s_tc: f64,
    /// Minutes between the second-to-last and last attempt.
    pub delta_t: f64,
    /// Decay half-scale in minutes.
    pub tau: f64,
    /// `(1 - s_tc) * delta_t / (delta_t + tau)`.
    pub fs: f64,
    /// Only comparable with levels of the same `source`.
    pub level: ForgettingLevel,
    pub last_correct: bool,
    pub attempts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trips_through_string() {
        for source in [
            MasterySource::History,
            MasterySource::knowledge_tracing("dkt"),
            MasterySource::llm("gpt-4o-mini"),
        ] {
            let parsed: MasterySource = source.to_string().parse().unwrap();
            assert_eq!(parsed, source);
        }
    }

    #[test]
    fn test_source_rejects_unknown() {
        assert!("bkt".parse::<MasterySource>().is_err());
        assert!("kt:".parse::<MasterySource>().is_err());
    }

    #[test]
    fn test_source_serializes_as_string() {
        let json = serde_json::to_string(&MasterySource::knowledge_tracing("akt")).unwrap();
        assert_eq!(json, "\"kt:akt\"");
    }

    #[test]
    fn test_level_display() {
        assert_eq!(ForgettingLevel::Medium.to_string(), "medium");
        assert_eq!("high".parse::<ForgettingLevel>().unwrap(), ForgettingLevel::High);
    }
}
