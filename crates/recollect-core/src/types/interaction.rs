//! Learner interaction history types.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::serde_helpers::{bool_or_number, string_or_number};
use crate::error::{RecollectError, RecollectResult};

/// One graded attempt by a learner on a concept, as delivered by the
/// upstream preprocessing step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    #[serde(deserialize_with = "string_or_number")]
    pub learner_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub concept_id: String,
    /// Raw timestamp: an interaction index, epoch seconds or epoch milliseconds.
    pub timestamp: f64,
    #[serde(deserialize_with = "bool_or_number")]
    pub correct: bool,
}

impl Interaction {
    /// Create a new interaction.
    pub fn new(
        learner_id: impl Into<String>,
        concept_id: impl Into<String>,
        timestamp: f64,
        correct: bool,
    ) -> Self {
        Self {
            learner_id: learner_id.into(),
            concept_id: concept_id.into(),
            timestamp,
            correct,
        }
    }
}

/// A timestamped correctness outcome within one concept history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Attempt {
    pub timestamp: f64,
    pub correct: bool,
}

impl Attempt {
    pub fn new(timestamp: f64, correct: bool) -> Self {
        Self { timestamp, correct }
    }
}

/// Chronological attempts of one learner on one concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptHistory {
    pub learner_id: String,
    pub concept_id: String,
    /// Attempts sorted by timestamp; equal timestamps keep input order.
    pub attempts: Vec<Attempt>,
}

impl ConceptHistory {
    /// Build a history, sorting attempts chronologically.
    pub fn new(
        learner_id: impl Into<String>,
        concept_id: impl Into<String>,
        mut attempts: Vec<Attempt>,
    ) -> Self {
        attempts.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self {
            learner_id: learner_id.into(),
            concept_id: concept_id.into(),
            attempts,
        }
    }

    /// Build a history from `(timestamp, correct)` pairs.
    pub fn from_pairs(
        learner_id: impl Into<String>,
        concept_id: impl Into<String>,
        pairs: &[(f64, bool)],
    ) -> Self {
        let attempts = pairs.iter().map(|&(t, c)| Attempt::new(t, c)).collect();
        Self::new(learner_id, concept_id, attempts)
    }

    /// Number of attempts.
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// The most recent attempt.
    pub fn last(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    /// All attempts before the most recent one.
    pub fn prior(&self) -> &[Attempt] {
        match self.attempts.len() {
            0 => &[],
            n => &self.attempts[..n - 1],
        }
    }

    /// Raw gap between the second-to-last and last attempt, in corpus units.
    pub fn last_gap(&self) -> Option<f64> {
        let n = self.attempts.len();
        if n < 2 {
            return None;
        }
        Some((self.attempts[n - 1].timestamp - self.attempts[n - 2].timestamp).max(0.0))
    }
}

/// All concept histories of a dataset, keyed by (learner, concept).
#[derive(Debug, Clone, Default)]
pub struct InteractionCorpus {
    histories: BTreeMap<(String, String), ConceptHistory>,
}

impl InteractionCorpus {
    /// Group interactions into per-learner, per-concept histories.
    pub fn from_interactions(interactions: impl IntoIterator<Item = Interaction>) -> Self {
        let mut grouped: BTreeMap<(String, String), Vec<Attempt>> = BTreeMap::new();
        for i in interactions {
            grouped
                .entry((i.learner_id, i.concept_id))
                .or_default()
                .push(Attempt::new(i.timestamp, i.correct));
        }

        let histories = grouped
            .into_iter()
            .map(|((learner, concept), attempts)| {
                let history = ConceptHistory::new(learner.clone(), concept.clone(), attempts);
                ((learner, concept), history)
            })
            .collect();

        Self { histories }
    }

    /// Read interactions from JSON Lines, one `Interaction` object per line.
    /// Blank lines are skipped.
    pub fn from_jsonl<R: BufRead>(reader: R) -> RecollectResult<Self> {
        let mut interactions = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let interaction: Interaction = serde_json::from_str(trimmed).map_err(|e| {
                RecollectError::parse(format!("line {}: {}", line_no + 1, e))
            })?;
            interactions.push(interaction);
        }
        Ok(Self::from_interactions(interactions))
    }

    /// Read a JSON Lines interaction file.
    pub fn from_jsonl_path(path: impl AsRef<Path>) -> RecollectResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_jsonl(std::io::BufReader::new(file))
    }

    /// Look up one learner's history for a concept.
    pub fn get(&self, learner_id: &str, concept_id: &str) -> Option<&ConceptHistory> {
        self.histories
            .get(&(learner_id.to_string(), concept_id.to_string()))
    }

    /// Iterate over all histories in (learner, concept) order.
    pub fn histories(&self) -> impl Iterator<Item = &ConceptHistory> {
        self.histories.values()
    }

    /// Number of learner-concept pairs.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    /// Whether the corpus has no histories.
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Largest absolute timestamp in the corpus, used for unit detection.
    pub fn max_abs_timestamp(&self) -> Option<f64> {
        self.histories
            .values()
            .flat_map(|h| h.attempts.iter())
            .map(|a| a.timestamp.abs())
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |m| m.max(t))))
    }
}
