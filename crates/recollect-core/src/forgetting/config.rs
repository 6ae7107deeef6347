//! Forgetting estimator configuration.

use serde::{Deserialize, Serialize};

use crate::error::{RecollectError, RecollectResult};

/// Default decay constant when the corpus gaps are degenerate.
pub const DEFAULT_FALLBACK_TAU_MINUTES: f64 = 60.0;

/// Forgetting estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgettingConfig {
    /// Fixed `tau` in minutes; when unset `tau` is calibrated from the corpus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tau_override: Option<f64>,
    /// `tau` used when the corpus median gap is zero or missing.
    pub fallback_tau_minutes: f64,
}

impl Default for ForgettingConfig {
    fn default() -> Self {
        Self {
            tau_override: None,
            fallback_tau_minutes: DEFAULT_FALLBACK_TAU_MINUTES,
        }
    }
}

impl ForgettingConfig {
    pub fn with_tau_override(mut self, tau: f64) -> Self {
        self.tau_override = Some(tau);
        self
    }

    pub fn validate(&self) -> RecollectResult<()> {
        if let Some(tau) = self.tau_override {
            if !(tau.is_finite() && tau > 0.0) {
                return Err(RecollectError::out_of_range(
                    "tau_override",
                    tau,
                    "a positive number of minutes",
                ));
            }
        }
        if !(self.fallback_tau_minutes.is_finite() && self.fallback_tau_minutes > 0.0) {
            return Err(RecollectError::out_of_range(
                "fallback_tau_minutes",
                self.fallback_tau_minutes,
                "a positive number of minutes",
            ));
        }
        Ok(())
    }
}
