//! Entity confidence scoring and multi-row pattern classification.

mod entity;
mod pattern;

pub use entity::{score_entity, EntityScore};
pub use pattern::{classify_multi_row, PatternMatch};
