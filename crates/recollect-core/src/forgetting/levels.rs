//! Population-relative bucketing of forgetting scores.
//!
//! Thresholds are the 33rd and 67th percentiles of one source's scores. They
//! are computed per source and never shared across sources.

use serde::{Deserialize, Serialize};

use crate::types::{ForgettingLevel, ForgettingRecord};

/// Lower bucket boundary, in percent.
pub const LOW_PERCENTILE: f64 = 33.0;

/// Upper bucket boundary, in percent.
pub const HIGH_PERCENTILE: f64 = 67.0;

/// Percentile `q` (0-100) of ascending `sorted` values, interpolating
/// linearly between closest ranks.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 100.0) / 100.0;
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Bucket boundaries for one source's population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelThresholds {
    /// 33rd percentile.
    pub low: f64,
    /// 67th percentile.
    pub high: f64,
}

impl LevelThresholds {
    /// Compute thresholds from a population of scores.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Some(Self {
            low: percentile(&sorted, LOW_PERCENTILE)?,
            high: percentile(&sorted, HIGH_PERCENTILE)?,
        })
    }

    /// `fs <= low` is low, `fs <= high` is medium, anything above is high.
    pub fn level(&self, fs: f64) -> ForgettingLevel {
        if fs <= self.low {
            ForgettingLevel::Low
        } else if fs <= self.high {
            ForgettingLevel::Medium
        } else {
            ForgettingLevel::High
        }
    }
}

/// Number of records per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl LevelCounts {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ForgettingRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.level {
                ForgettingLevel::Low => counts.low += 1,
                ForgettingLevel::Medium => counts.medium += 1,
                ForgettingLevel::High => counts.high += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}
