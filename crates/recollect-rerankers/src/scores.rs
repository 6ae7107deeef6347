//! Mapping indexed provider results back to input order.

use recollect_core::error::{RecollectError, RecollectResult};

/// Place `(index, score)` pairs into a vector of `len` scores.
///
/// Every input position must be scored exactly once.
pub(crate) fn in_input_order(
    results: impl IntoIterator<Item = (usize, f32)>,
    len: usize,
) -> RecollectResult<Vec<f32>> {
    let mut scores: Vec<Option<f32>> = vec![None; len];
    for (index, score) in results {
        let slot = scores.get_mut(index).ok_or_else(|| {
            RecollectError::reranker(format!("result index {} out of range for {} documents", index, len))
        })?;
        if slot.replace(score).is_some() {
            return Err(RecollectError::reranker(format!("document {} scored twice", index)));
        }
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(index, score)| {
            score.ok_or_else(|| RecollectError::reranker(format!("document {} was not scored", index)))
        })
        .collect()
}
