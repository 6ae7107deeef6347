//! Persona and memory fragments and their versioned embeddings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::serde_helpers::{bool_or_number, string_or_number};

/// Long-term mastery summary of one learner on one concept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonaFragment {
    #[serde(deserialize_with = "string_or_number")]
    pub concept_id: String,
    /// Concept display text.
    pub concept: String,
    pub description: String,
    pub keywords: String,
    #[serde(default)]
    pub correct: u32,
    #[serde(default)]
    pub total: u32,
}

impl PersonaFragment {
    /// Fraction of attempts answered correctly, if any were made.
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

/// Short-term episodic record of one interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryFragment {
    #[serde(deserialize_with = "string_or_number")]
    pub concept_id: String,
    /// Concept display text.
    pub concept: String,
    pub description: String,
    /// Keyword summary; the description stands in when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(deserialize_with = "bool_or_number")]
    pub correct: bool,
}

impl MemoryFragment {
    /// Keyword text, falling back to the description.
    pub fn keywords_text(&self) -> &str {
        self.keywords.as_deref().unwrap_or(&self.description)
    }

    /// Whether this record belongs to the given concept text.
    pub fn matches_concept(&self, concept: &str) -> bool {
        self.concept.trim().eq_ignore_ascii_case(concept.trim())
    }
}

/// Which fragment pool a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Pool {
    Persona,
    Memory,
}

/// Which text of a fragment an embedding was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmbeddingKind {
    Description,
    Keywords,
}

/// Content hash identifying the exact text an embedding was computed from.
pub fn text_hash(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// One entry of an embedding sidecar file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredEmbedding {
    /// Position of the fragment in its fragment file.
    pub index: usize,
    /// `text_hash` of the text the vector was computed from.
    pub text_hash: String,
    pub vector: Vec<f32>,
}

impl StoredEmbedding {
    /// Create a sidecar entry for `text`.
    pub fn for_text(index: usize, text: &str, vector: Vec<f32>) -> Self {
        Self {
            index,
            text_hash: text_hash(text),
            vector,
        }
    }
}

/// All embeddings of one kind for one learner's pool, keyed by fragment index.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingSet {
    by_index: HashMap<usize, StoredEmbedding>,
}

impl EmbeddingSet {
    /// Build a set from sidecar entries. Later entries for the same index win.
    pub fn from_entries(entries: impl IntoIterator<Item = StoredEmbedding>) -> Self {
        Self {
            by_index: entries.into_iter().map(|e| (e.index, e)).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&StoredEmbedding> {
        self.by_index.get(&index)
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

/// A text bound to the embedding computed from it.
///
/// Only constructible by [`EmbeddedText::bind`], which checks the content hash,
/// so a vector can never be paired with text it was not computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedText {
    text: String,
    vector: Vec<f32>,
}

impl EmbeddedText {
    /// Bind `text` to `stored` if the stored hash matches the text.
    pub fn bind(text: &str, stored: &StoredEmbedding) -> Option<Self> {
        if stored.text_hash != text_hash(text) {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            vector: stored.vector.clone(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_keywords_fall_back_to_description() {
        let fragment = MemoryFragment {
            concept_id: "7".to_string(),
            concept: "Fractions".to_string(),
            description: "Answered 3/4 + 1/4 incorrectly".to_string(),
            keywords: None,
            timestamp: 12.0,
            correct: false,
        };
        assert_eq!(fragment.keywords_text(), "Answered 3/4 + 1/4 incorrectly");
        assert!(fragment.matches_concept("  fractions "));
        assert!(!fragment.matches_concept("decimals"));
    }

    #[test]
    fn test_bind_rejects_stale_embedding() {
        let stored = StoredEmbedding::for_text(0, "original text", vec![1.0, 0.0]);
        assert!(EmbeddedText::bind("original text", &stored).is_some());
        assert!(EmbeddedText::bind("edited text", &stored).is_none());
    }

    #[test]
    fn test_persona_accuracy() {
        let persona = PersonaFragment {
            concept_id: "c".to_string(),
            concept: "Ratios".to_string(),
            description: "d".to_string(),
            keywords: "k".to_string(),
            correct: 3,
            total: 4,
        };
        assert_eq!(persona.accuracy(), Some(0.75));
        assert_eq!(PersonaFragment { total: 0, ..persona }.accuracy(), None);
    }

    #[test]
    fn test_pool_display() {
        assert_eq!(Pool::Persona.to_string(), "persona");
        assert_eq!(EmbeddingKind::Keywords.to_string(), "keywords");
    }
}
