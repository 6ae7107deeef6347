//! Mastery from raw correctness history.

use async_trait::async_trait;

use crate::error::{RecollectError, RecollectResult};
use crate::traits::MasteryEstimator;
use crate::types::{ConceptHistory, MasterySource};

/// Mean correctness of the attempts before `as_of`.
#[derive(Debug, Clone)]
pub struct HistoryMastery {
    source: MasterySource,
}

impl HistoryMastery {
    pub fn new() -> Self {
        Self {
            source: MasterySource::History,
        }
    }
}

impl Default for HistoryMastery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MasteryEstimator for HistoryMastery {
    fn source(&self) -> &MasterySource {
        &self.source
    }

    async fn estimate_mastery(&self, history: &ConceptHistory, as_of: usize) -> RecollectResult<f64> {
        let prior = &history.attempts[..as_of.min(history.len())];
        if prior.is_empty() {
            return Err(RecollectError::mastery_unavailable(
                self.source.to_string(),
                format!(
                    "no attempts before index {} for {}/{}",
                    as_of, history.learner_id, history.concept_id
                ),
            ));
        }
        let correct = prior.iter().filter(|a| a.correct).count();
        Ok(correct as f64 / prior.len() as f64)
    }
}
