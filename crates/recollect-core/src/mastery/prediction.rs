//! Knowledge-tracing predictions loaded from a trained model's export.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{RecollectError, RecollectResult};
use crate::traits::MasteryEstimator;
use crate::types::{ConceptHistory, MasterySource};

/// Per-attempt mastery predictions of one knowledge-tracing model.
///
/// JSON layout: `{ "<learner>": { "<concept>": [p0, p1, ...] } }`, where
/// `p_i` is the predicted probability of mastery just before attempt `i` of
/// that pair's chronological history.
#[derive(Debug, Clone)]
pub struct PredictionTable {
    source: MasterySource,
    predictions: HashMap<String, HashMap<String, Vec<f64>>>,
}

impl PredictionTable {
    pub fn new(model: impl Into<String>, predictions: HashMap<String, HashMap<String, Vec<f64>>>) -> Self {
        Self {
            source: MasterySource::knowledge_tracing(model),
            predictions,
        }
    }

    pub fn from_json_str(model: impl Into<String>, json: &str) -> RecollectResult<Self> {
        let predictions = serde_json::from_str(json)
            .map_err(|e| RecollectError::parse(format!("invalid prediction table: {}", e)))?;
        Ok(Self::new(model, predictions))
    }

    pub fn from_json_path(model: impl Into<String>, path: impl AsRef<Path>) -> RecollectResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(model, &content)
    }

    /// Number of learners with predictions.
    pub fn learners(&self) -> usize {
        self.predictions.len()
    }

    fn lookup(&self, learner_id: &str, concept_id: &str, as_of: usize) -> Option<f64> {
        self.predictions
            .get(learner_id)?
            .get(concept_id)?
            .get(as_of)
            .copied()
    }
}

#[async_trait]
impl MasteryEstimator for PredictionTable {
    fn source(&self) -> &MasterySource {
        &self.source
    }

    async fn estimate_mastery(&self, history: &ConceptHistory, as_of: usize) -> RecollectResult<f64> {
        match self.lookup(&history.learner_id, &history.concept_id, as_of) {
            Some(p) if p.is_finite() => Ok(p.clamp(0.0, 1.0)),
            Some(_) => Err(RecollectError::mastery_unavailable(
                self.source.to_string(),
                format!(
                    "non-finite prediction at attempt {} for {}/{}",
                    as_of, history.learner_id, history.concept_id
                ),
            )),
            None => Err(RecollectError::mastery_unavailable(
                self.source.to_string(),
                format!(
                    "no prediction at attempt {} for {}/{}",
                    as_of, history.learner_id, history.concept_id
                ),
            )),
        }
    }
}
