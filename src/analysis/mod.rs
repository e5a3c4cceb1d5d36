//! Analysis modules.
//!
//! Turns fetch outcomes into the snapshot consumed by the renderers and
//! compares it against the previous run.

pub mod aggregator;
pub mod regression;

pub use aggregator::*;
pub use regression::{credit_regressions, load_previous};
