//! Core types for recollect.

mod forgetting;
mod fragment;
mod interaction;
mod message;
mod retrieval;
mod serde_helpers;

pub use forgetting::*;
pub use fragment::*;
pub use interaction::*;
pub use message::*;
pub use retrieval::*;
