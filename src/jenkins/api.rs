use crate::error::Result;

use super::types::{BuildStatus, BuildSummary, JobReference, JobSummary, LogChunk, QueueState};

/// The Jenkins remote API operations jj depends on.
///
/// Each call is a single request with its own timeout; implementations never
/// retry. Polling loops decide what is worth retrying.
#[allow(async_fn_in_trait)]
pub trait JenkinsApi {
    /// Submits a build and returns the queue id from the `Location` header.
    async fn trigger(&self, job: &JobReference) -> Result<u64>;

    async fn queue_item(&self, id: u64) -> Result<QueueState>;

    async fn build_status(&self, job: &str, number: u64) -> Result<BuildStatus>;

    /// Fetches console output starting at byte `offset`.
    async fn console_chunk(&self, job: &str, number: u64, offset: u64) -> Result<LogChunk>;

    async fn stop_build(&self, job: &str, number: u64) -> Result<()>;

    async fn list_jobs(&self) -> Result<Vec<JobSummary>>;

    /// Most recent builds first, at most `limit` of them.
    async fn list_builds(&self, job: &str, limit: usize) -> Result<Vec<BuildSummary>>;
}
