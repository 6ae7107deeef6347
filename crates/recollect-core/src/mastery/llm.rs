//! Mastery judged by a language model.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RecollectError, RecollectResult};
use crate::traits::{CompletionOptions, Llm, MasteryEstimator};
use crate::types::{ConceptHistory, MasterySource, Message};

static PROBABILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?|\.\d+)\s*(%)?").expect("probability pattern is valid")
});

const SYSTEM_PROMPT: &str = "You estimate student knowledge. Given a student's past attempts \
on one concept, reply with the probability (0.0 to 1.0) that the student has mastered it. \
Only output the number.";

/// Extract a probability from a model reply.
///
/// Accepts a bare number, a JSON object with a `probability` field, or a
/// percentage. In free text the last number in [0, 1] is taken.
pub fn parse_probability(reply: &str) -> Option<f64> {
    let trimmed = reply.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let p = match &value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::Object(map) => map.get("probability").and_then(|v| v.as_f64()),
            _ => None,
        };
        if let Some(p) = p {
            return (0.0..=1.0).contains(&p).then_some(p);
        }
    }

    PROBABILITY
        .captures_iter(trimmed)
        .filter_map(|captures| {
            let mut p: f64 = captures.get(1)?.as_str().parse().ok()?;
            if captures.get(2).is_some() {
                p /= 100.0;
            }
            (0.0..=1.0).contains(&p).then_some(p)
        })
        .last()
}

/// Asks an [`Llm`] backend for the mastery probability of a pair.
pub struct LlmMastery {
    llm: Arc<dyn Llm>,
    source: MasterySource,
}

impl LlmMastery {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        let source = MasterySource::llm(llm.model_name());
        Self { llm, source }
    }

    fn build_prompt(&self, history: &ConceptHistory, as_of: usize) -> String {
        let mut prompt = format!("Concept: {}\n\nPast attempts (oldest first):\n", history.concept_id);
        for (i, attempt) in history.attempts[..as_of].iter().enumerate() {
            let outcome = if attempt.correct { "correct" } else { "incorrect" };
            prompt.push_str(&format!("{}. t={} {}\n", i + 1, attempt.timestamp, outcome));
        }
        prompt.push_str("\nProbability of mastery:");
        prompt
    }
}

#[async_trait]
impl MasteryEstimator for LlmMastery {
    fn source(&self) -> &MasterySource {
        &self.source
    }

    async fn estimate_mastery(&self, history: &ConceptHistory, as_of: usize) -> RecollectResult<f64> {
        let as_of = as_of.min(history.len());
        if as_of == 0 {
            return Err(RecollectError::mastery_unavailable(
                self.source.to_string(),
                "no attempts to judge",
            ));
        }

        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(self.build_prompt(history, as_of)),
        ];
        let reply = self
            .llm
            .complete(&messages, Some(CompletionOptions::scoring()))
            .await
            .map_err(|e| RecollectError::mastery_unavailable(self.source.to_string(), e.to_string()))?;

        parse_probability(&reply).ok_or_else(|| {
            RecollectError::mastery_unavailable(
                self.source.to_string(),
                format!("unparseable reply: {}", reply.trim()),
            )
        })
    }
}
