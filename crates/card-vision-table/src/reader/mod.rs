//! Per-frame table reading.
//!
//! This module wires together table location, card slot preprocessing,
//! suit-color priors, library matching, confidence gating and learning.

mod pipeline;
mod result;

pub use pipeline::TableReader;
pub use result::{SlotOutcome, SlotReading, TableReading};
