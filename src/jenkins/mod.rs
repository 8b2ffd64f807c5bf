mod api;
mod client;
pub mod links;
mod lister;
mod monitor;
mod policy;
mod trigger;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::JenkinsClient;
pub use lister::{JobLister, DEFAULT_BUILD_LIMIT};
pub use monitor::{BuildMonitor, StopOutcome};
pub use policy::PollPolicy;
pub use trigger::QueueResolver;
pub use types::{Build, BuildState, BuildSummary, JobReference, JobSummary, QueueItem};
