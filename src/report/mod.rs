//! Run summary reports.

mod generator;

pub use generator::write_report;
