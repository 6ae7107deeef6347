//! Timestamp unit detection.
//!
//! Datasets store interaction times as raw indices, epoch seconds or epoch
//! milliseconds. The unit is detected once from the largest timestamp in the
//! corpus and the same conversion is applied to every pair.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::types::InteractionCorpus;

/// Timestamps at or above this magnitude are read as epoch milliseconds.
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Timestamps at or above this magnitude are read as epoch seconds.
pub const EPOCH_SECONDS_THRESHOLD: f64 = 1e8;

/// Unit of the raw timestamps in a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeUnit {
    /// Interaction indices or minutes; one unit counts as one minute.
    Index,
    EpochSeconds,
    EpochMillis,
}

/// Conversion from raw corpus timestamps to minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeScale {
    pub unit: TimeUnit,
}

impl TimeScale {
    pub fn new(unit: TimeUnit) -> Self {
        Self { unit }
    }

    /// Detect the unit from the largest absolute timestamp.
    pub fn detect(max_abs_timestamp: f64) -> Self {
        let unit = if max_abs_timestamp >= EPOCH_MILLIS_THRESHOLD {
            TimeUnit::EpochMillis
        } else if max_abs_timestamp >= EPOCH_SECONDS_THRESHOLD {
            TimeUnit::EpochSeconds
        } else {
            TimeUnit::Index
        };
        Self { unit }
    }

    /// Detect the unit for a whole corpus. Empty corpora default to indices.
    pub fn for_corpus(corpus: &InteractionCorpus) -> Self {
        corpus
            .max_abs_timestamp()
            .map(Self::detect)
            .unwrap_or(Self::new(TimeUnit::Index))
    }

    /// Raw units per minute.
    pub fn units_per_minute(&self) -> f64 {
        match self.unit {
            TimeUnit::Index => 1.0,
            TimeUnit::EpochSeconds => 60.0,
            TimeUnit::EpochMillis => 60_000.0,
        }
    }

    /// Convert a raw duration to minutes.
    pub fn to_minutes(&self, raw: f64) -> f64 {
        raw / self.units_per_minute()
    }
}
