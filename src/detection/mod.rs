//! Detection of structural problems in the observation panel.
//!
//! Currently: date blocks missing for a group of stores.

mod gaps;

pub use gaps::{detect_gaps, GapReport};
