//! Analysis modules.
//!
//! Turns the raw epoch delta into the anomaly count the run reports.

pub mod aggregator;

pub use aggregator::*;
