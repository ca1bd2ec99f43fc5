//! Pre-change validation workflow.

pub mod baseline;
pub mod orchestrator;
pub mod poller;
pub mod submitter;

pub use orchestrator::{Orchestrator, RunSummary};
pub use poller::JobPoller;
