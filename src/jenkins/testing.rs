//! In-memory Jenkins used by the polling tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{JenkinsError, Result};

use super::api::JenkinsApi;
use super::policy::PollPolicy;
use super::types::{
    BuildState, BuildStatus, BuildSummary, JobReference, JobSummary, LogChunk, QueueState,
};

pub fn test_policy() -> PollPolicy {
    PollPolicy {
        request_timeout: Duration::from_secs(1),
        poll_interval: Duration::from_millis(5),
        resolve_timeout: Duration::from_secs(5),
        max_transient_failures: 3,
    }
}

pub fn status(state: BuildState) -> BuildStatus {
    BuildStatus {
        state,
        started_at: None,
        duration: None,
    }
}

pub enum LogStep {
    /// Serve at most this many bytes from the requested offset
    Chunk(usize),
    Fail(JenkinsError),
}

#[derive(Default)]
struct Script {
    triggers: VecDeque<Result<u64>>,
    queue: VecDeque<Result<QueueState>>,
    queue_fallback: Option<QueueState>,
    queue_polls: usize,
    statuses: VecDeque<Result<BuildStatus>>,
    status_fallback: Option<BuildStatus>,
    status_polls: usize,
    log: Vec<u8>,
    log_steps: VecDeque<LogStep>,
    log_requests: Vec<u64>,
    stops: Vec<u64>,
    jobs: Vec<JobSummary>,
    builds: Vec<BuildSummary>,
}

/// Replays scripted responses in order.
///
/// Status and queue scripts fall back to their last configured value once
/// exhausted; the log is served by offset so wrong offsets show up as
/// duplicated or missing bytes.
#[derive(Default)]
pub struct ScriptedJenkins {
    script: Mutex<Script>,
}

impl ScriptedJenkins {
    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.script.lock().unwrap())
    }

    pub fn push_trigger(&self, result: Result<u64>) {
        self.with(|s| s.triggers.push_back(result));
    }

    pub fn push_queue(&self, result: Result<QueueState>) {
        self.with(|s| s.queue.push_back(result));
    }

    pub fn set_queue_fallback(&self, state: QueueState) {
        self.with(|s| s.queue_fallback = Some(state));
    }

    pub fn queue_polls(&self) -> usize {
        self.with(|s| s.queue_polls)
    }

    pub fn push_status(&self, result: Result<BuildStatus>) {
        self.with(|s| {
            if let Ok(status) = &result {
                s.status_fallback = Some(status.clone());
            }
            s.statuses.push_back(result);
        });
    }

    pub fn status_polls(&self) -> usize {
        self.with(|s| s.status_polls)
    }

    pub fn set_log(&self, log: &[u8], steps: impl IntoIterator<Item = LogStep>) {
        self.with(|s| {
            s.log = log.to_vec();
            s.log_steps = steps.into_iter().collect();
        });
    }

    pub fn log_requests(&self) -> Vec<u64> {
        self.with(|s| s.log_requests.clone())
    }

    pub fn stops(&self) -> Vec<u64> {
        self.with(|s| s.stops.clone())
    }

    pub fn set_jobs(&self, jobs: Vec<JobSummary>) {
        self.with(|s| s.jobs = jobs);
    }

    pub fn set_builds(&self, builds: Vec<BuildSummary>) {
        self.with(|s| s.builds = builds);
    }
}

impl JenkinsApi for ScriptedJenkins {
    async fn trigger(&self, _job: &JobReference) -> Result<u64> {
        self.with(|s| s.triggers.pop_front().unwrap_or(Ok(1)))
    }

    async fn queue_item(&self, _id: u64) -> Result<QueueState> {
        self.with(|s| {
            s.queue_polls += 1;
            s.queue.pop_front().unwrap_or_else(|| {
                Ok(s.queue_fallback
                    .clone()
                    .unwrap_or(QueueState::Waiting { why: None }))
            })
        })
    }

    async fn build_status(&self, _job: &str, _number: u64) -> Result<BuildStatus> {
        self.with(|s| {
            s.status_polls += 1;
            s.statuses.pop_front().unwrap_or_else(|| {
                Ok(s.status_fallback
                    .clone()
                    .unwrap_or_else(|| status(BuildState::Running)))
            })
        })
    }

    async fn console_chunk(&self, _job: &str, _number: u64, offset: u64) -> Result<LogChunk> {
        self.with(|s| {
            s.log_requests.push(offset);
            let start = (offset as usize).min(s.log.len());
            let end = match s.log_steps.pop_front() {
                Some(LogStep::Fail(e)) => return Err(e),
                Some(LogStep::Chunk(size)) => (start + size).min(s.log.len()),
                None => s.log.len(),
            };
            Ok(LogChunk {
                data: s.log[start..end].to_vec(),
                next_offset: end as u64,
                more_data: end < s.log.len() || !s.log_steps.is_empty(),
            })
        })
    }

    async fn stop_build(&self, _job: &str, number: u64) -> Result<()> {
        self.with(|s| s.stops.push(number));
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        Ok(self.with(|s| s.jobs.clone()))
    }

    async fn list_builds(&self, _job: &str, _limit: usize) -> Result<Vec<BuildSummary>> {
        Ok(self.with(|s| s.builds.clone()))
    }
}
