//! Mastery-estimate source trait.

use async_trait::async_trait;

use crate::error::RecollectResult;
use crate::types::{ConceptHistory, MasterySource};

/// A source of mastery probabilities for learner-concept pairs.
///
/// The forgetting estimator depends only on this trait: raw correctness
/// history, each knowledge-tracing model, and LLM judges all plug in here.
#[async_trait]
pub trait MasteryEstimator: Send + Sync {
    /// Identity of this source. Levels from different sources are never mixed.
    fn source(&self) -> &MasterySource;

    /// Probability in [0, 1] that the learner had mastered the concept just
    /// before attempt `as_of` (an index into `history.attempts`).
    ///
    /// Implementations must not look at attempts at or after `as_of`.
    async fn estimate_mastery(
        &self,
        history: &ConceptHistory,
        as_of: usize,
    ) -> RecollectResult<f64>;
}
