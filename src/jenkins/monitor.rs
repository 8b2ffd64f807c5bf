use log::{debug, info};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::error::{JenkinsError, Result};

use super::api::JenkinsApi;
use super::policy::{FailureStreak, PollPolicy};
use super::types::{Build, BuildState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Jenkins accepted the stop request; a later poll observes the result
    Requested,
    /// The build had already finished, nothing was sent
    AlreadyFinished,
}

/// Follows a build's status and console output.
pub struct BuildMonitor<'a, A> {
    api: &'a A,
    policy: PollPolicy,
}

impl<'a, A: JenkinsApi> BuildMonitor<'a, A> {
    pub fn new(api: &'a A, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Refreshes the build once and hands any new console bytes to `on_output`.
    ///
    /// The offset only advances after a chunk has been delivered, so a failed
    /// poll can be repeated without losing or repeating output.
    pub async fn poll(&self, build: &mut Build, on_output: &mut impl FnMut(&[u8])) -> Result<()> {
        let status = self
            .api
            .build_status(&build.job.job, build.number())
            .await
            .map_err(|e| not_found_as_build(e, build))?;
        build.apply_status(&status);

        let wants_log = match build.state() {
            BuildState::Running => true,
            state if state.is_terminal() => !build.is_finished(),
            _ => false,
        };
        if !wants_log {
            return Ok(());
        }

        let chunk = self
            .api
            .console_chunk(&build.job.job, build.number(), build.log_offset())
            .await
            .map_err(|e| not_found_as_build(e, build))?;

        if !chunk.data.is_empty() {
            on_output(&chunk.data);
        }
        build.consume_log(&chunk);

        Ok(())
    }

    /// Polls until the build is finished and its log drained, or until `cancel`
    /// turns true. A cancelled run returns the build in its last observed state.
    pub async fn run(
        &self,
        mut build: Build,
        mut cancel: watch::Receiver<bool>,
        mut on_output: impl FnMut(&[u8]),
    ) -> Result<Build> {
        let mut streak = FailureStreak::new(self.policy.max_transient_failures);

        loop {
            if *cancel.borrow() {
                info!("Stopped following '{}' #{}", build.job.job, build.number());
                return Ok(build);
            }

            match self.poll(&mut build, &mut on_output).await {
                Ok(()) => streak.reset(),
                Err(e) => streak.record(e).map_err(|e| {
                    if e.is_transient() {
                        JenkinsError::MonitorUnreachable {
                            job: build.job.job.clone(),
                            number: build.number(),
                            failures: streak.current(),
                        }
                    } else {
                        e
                    }
                })?,
            }

            if build.is_finished() {
                debug!(
                    "Build '{}' #{} finished with {}",
                    build.job.job,
                    build.number(),
                    build.state()
                );
                return Ok(build);
            }

            tokio::select! {
                _ = sleep(self.policy.poll_interval) => {}
                Ok(()) = cancel.changed() => {}
            }
        }
    }

    /// Asks Jenkins to abort a queued or running build. Finished builds are left
    /// alone.
    pub async fn stop(&self, build: &Build) -> Result<StopOutcome> {
        if build.is_terminal() {
            return Ok(StopOutcome::AlreadyFinished);
        }

        let status = self
            .api
            .build_status(&build.job.job, build.number())
            .await
            .map_err(|e| not_found_as_build(e, build))?;
        if status.state.is_terminal() {
            debug!(
                "Build '{}' #{} already finished with {}",
                build.job.job,
                build.number(),
                status.state
            );
            return Ok(StopOutcome::AlreadyFinished);
        }

        self.api
            .stop_build(&build.job.job, build.number())
            .await
            .map_err(|e| not_found_as_build(e, build))?;
        info!("Requested stop of '{}' #{}", build.job.job, build.number());

        Ok(StopOutcome::Requested)
    }
}

fn not_found_as_build(error: JenkinsError, build: &Build) -> JenkinsError {
    match error {
        JenkinsError::NotFound { .. } => JenkinsError::BuildNotFound {
            job: build.job.job.clone(),
            number: build.number(),
        },
        other => other,
    }
}
