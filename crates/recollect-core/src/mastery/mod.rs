//! Mastery-estimate sources.

mod history;
mod llm;
mod prediction;

pub use history::HistoryMastery;
pub use llm::{parse_probability, LlmMastery};
pub use prediction::PredictionTable;
