//! Forgetting score estimation.
//!
//! `fs = (1 - s_tc) * delta_t / (delta_t + tau)` per learner-concept pair,
//! with `tau` calibrated from the corpus and levels bucketed by the
//! population percentiles of each mastery source.

mod calibration;
mod config;
mod engine;
mod estimator;
mod levels;
mod score;
mod time;

pub use calibration::{calibrate_tau, median, TauCalibration};
pub use config::{ForgettingConfig, DEFAULT_FALLBACK_TAU_MINUTES};
pub use engine::ForgettingEngine;
pub use estimator::{ForgettingEstimator, PairEstimate, SourceRecords};
pub use levels::{percentile, LevelCounts, LevelThresholds, HIGH_PERCENTILE, LOW_PERCENTILE};
pub use score::forgetting_score;
pub use time::{TimeScale, TimeUnit, EPOCH_MILLIS_THRESHOLD, EPOCH_SECONDS_THRESHOLD};
