use chrono::Utc;
use log::{debug, info};
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

use crate::error::{JenkinsError, Result};

use super::api::JenkinsApi;
use super::policy::{FailureStreak, PollPolicy};
use super::types::{Build, BuildState, JobReference, QueueItem, QueueState};

/// Submits builds and waits for Jenkins to turn the queue item into a numbered build.
pub struct QueueResolver<'a, A> {
    api: &'a A,
    policy: PollPolicy,
}

impl<'a, A: JenkinsApi> QueueResolver<'a, A> {
    pub fn new(api: &'a A, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub async fn trigger(&self, job: &JobReference) -> Result<QueueItem> {
        let id = self.api.trigger(job).await.map_err(|e| match e {
            JenkinsError::NotFound { .. } => JenkinsError::JobNotFound(job.job.clone()),
            other => other,
        })?;

        info!("Job '{}' queued as item {id}", job.job);

        Ok(QueueItem {
            id,
            job: job.clone(),
            submitted_at: Utc::now(),
        })
    }

    /// Polls the queue item until it is assigned a build number, is cancelled,
    /// `deadline` passes or `cancel` turns true.
    ///
    /// Unreachable or 5xx responses are retried until the failure streak exceeds
    /// the policy limit.
    pub async fn resolve_build(
        &self,
        item: &QueueItem,
        deadline: Instant,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Build> {
        let started = Instant::now();
        let mut streak = FailureStreak::new(self.policy.max_transient_failures);
        let mut last_why: Option<String> = None;

        loop {
            if *cancel.borrow() {
                info!("Stopped waiting for queue item {}", item.id);
                return Err(JenkinsError::Interrupted { queue_id: item.id });
            }

            let state = tokio::select! {
                state = self.api.queue_item(item.id) => state,
                Ok(()) = cancel.changed() => continue,
            };

            match state {
                Ok(QueueState::Assigned { number }) => {
                    let waited = (Utc::now() - item.submitted_at).num_seconds();
                    info!("Queue item {} is build #{number} after {waited}s", item.id);
                    let mut build = Build::new(item.job.clone(), number);
                    build.advance(BuildState::Queued);
                    return Ok(build);
                }
                Ok(QueueState::Cancelled) => {
                    return Err(JenkinsError::BuildAborted { queue_id: item.id });
                }
                Ok(QueueState::Waiting { why }) => {
                    streak.reset();
                    if why.is_some() && why != last_why {
                        debug!(
                            "Queue item {}: {}",
                            item.id,
                            why.as_deref().unwrap_or_default()
                        );
                        last_why = why;
                    }
                }
                Err(e) => streak.record(e)?,
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(JenkinsError::ResolutionTimeout {
                    queue_id: item.id,
                    waited: now - started,
                });
            }

            tokio::select! {
                _ = sleep(self.policy.poll_interval.min(deadline - now)) => {}
                Ok(()) = cancel.changed() => {}
            }
        }
    }
}
