//! Corpus-level calibration of the decay constant `tau`.

use serde::{Deserialize, Serialize};

use super::time::TimeScale;
use crate::types::InteractionCorpus;

/// Outcome of calibrating `tau` over a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TauCalibration {
    /// Decay half-scale in minutes, always positive.
    pub tau: f64,
    /// Median last-two-attempt gap in minutes, if any pair had two attempts.
    pub median_gap: Option<f64>,
    /// Number of learner-concept pairs that contributed a gap.
    pub pairs: usize,
    /// True when the median was unusable and `tau` is the fallback.
    pub fell_back: bool,
    /// True when `tau` was set explicitly instead of derived.
    pub overridden: bool,
}

/// Median of `values`; the mean of the two middle values for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Calibrate `tau` as the median last-two-attempt gap across all pairs.
///
/// Zero gaps take part in the median. A missing or non-positive median falls
/// back to `fallback_tau`.
pub fn calibrate_tau(
    corpus: &InteractionCorpus,
    scale: TimeScale,
    fallback_tau: f64,
) -> TauCalibration {
    let mut gaps: Vec<f64> = corpus
        .histories()
        .filter_map(|h| h.last_gap())
        .map(|g| scale.to_minutes(g))
        .filter(|g| g.is_finite())
        .collect();

    let pairs = gaps.len();
    let median_gap = median(&mut gaps);

    match median_gap {
        Some(m) if m > 0.0 => TauCalibration {
            tau: m,
            median_gap,
            pairs,
            fell_back: false,
            overridden: false,
        },
        _ => {
            tracing::warn!(
                pairs,
                fallback_tau,
                "Degenerate inter-attempt gaps, using fallback tau"
            );
            TauCalibration {
                tau: fallback_tau,
                median_gap,
                pairs,
                fell_back: true,
                overridden: false,
            }
        }
    }
}
