//! The forgetting score formula.

/// Decay-weighted estimate of forgotten mastery.
///
/// `fs = (1 - s_tc) * delta_t / (delta_t + tau)`, with `s_tc` clamped to
/// [0, 1] and `delta_t` floored at 0. The result lies in [0, 1]: it is 0 right
/// after an attempt and approaches `1 - s_tc` as the gap grows.
pub fn forgetting_score(s_tc: f64, delta_t: f64, tau: f64) -> f64 {
    debug_assert!(tau > 0.0, "tau must be positive");

    let unlearned = 1.0 - s_tc.clamp(0.0, 1.0);
    let delta_t = delta_t.max(0.0);
    if delta_t.is_infinite() {
        return unlearned;
    }

    let denom = delta_t + tau;
    if denom <= 0.0 {
        return 0.0;
    }
    (unlearned * delta_t / denom).clamp(0.0, 1.0)
}
