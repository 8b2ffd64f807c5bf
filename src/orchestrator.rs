use std::collections::BTreeMap;

use log::{debug, info};
use tokio::sync::watch;
use tokio::time::Instant;
use url::Url;

use crate::error::{JenkinsError, Result};
use crate::jenkins::links::build_url;
use crate::jenkins::{
    Build, BuildMonitor, BuildState, BuildSummary, JenkinsClient, JobLister, JobReference,
    JobSummary, PollPolicy, QueueItem, QueueResolver, StopOutcome,
};
use crate::registry::{Environment, EnvironmentRegistry};

pub const BUILD_FAILED_EXIT_CODE: i32 = 1;
pub const BUILD_ABORTED_EXIT_CODE: i32 = 8;
/// Exit code used when the user stops following a build with Ctrl-C.
pub const DETACHED_EXIT_CODE: i32 = 130;

/// A resolved `jj run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Environment name; empty means the current one
    pub environment: String,
    pub job: String,
    pub parameters: BTreeMap<String, String>,
    /// Follow the build until it finishes instead of returning once it has a number
    pub follow: bool,
}

/// Progress callbacks for `run`. Only `output` is mandatory.
pub trait RunObserver {
    fn queued(&mut self, _item: &QueueItem) {}

    fn started(&mut self, _build: &Build, _url: &Url) {}

    /// Receives console bytes in the order Jenkins produced them.
    fn output(&mut self, chunk: &[u8]);
}

#[derive(Debug)]
pub struct RunOutcome {
    pub build: Build,
    pub followed: bool,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        if !self.followed {
            return 0;
        }

        match self.build.state() {
            BuildState::Success => 0,
            BuildState::Failure => BUILD_FAILED_EXIT_CODE,
            BuildState::Aborted => BUILD_ABORTED_EXIT_CODE,
            BuildState::Queued | BuildState::Running | BuildState::Unknown => DETACHED_EXIT_CODE,
        }
    }
}

#[derive(Debug)]
pub struct StopReport {
    pub build: Build,
    pub outcome: StopOutcome,
}

/// Entry point for every command: resolves the environment, binds a client to
/// it and sequences the trigger, monitor and lister.
pub struct Orchestrator {
    registry: EnvironmentRegistry,
    policy: PollPolicy,
}

impl Orchestrator {
    pub fn new(registry: EnvironmentRegistry, policy: PollPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    fn connect(&self, environment: &str) -> Result<(&Environment, JenkinsClient)> {
        let env = self.registry.resolve(environment)?;
        debug!("Using Jenkins '{}' at {}", env.name, env.url);
        let client = JenkinsClient::new(env, self.policy.request_timeout)?;
        Ok((env, client))
    }

    /// Triggers a job and, when following, streams its console until it finishes.
    ///
    /// `cancel` interrupts the wait for a build number with
    /// [`JenkinsError::Interrupted`]; once the build runs it only detaches.
    pub async fn run(
        &self,
        request: &RunRequest,
        mut cancel: watch::Receiver<bool>,
        observer: &mut impl RunObserver,
    ) -> Result<RunOutcome> {
        let (env, client) = self.connect(&request.environment)?;
        let job = JobReference::new(env.name.clone(), request.job.clone())
            .with_parameters(request.parameters.clone());

        let resolver = QueueResolver::new(&client, self.policy);
        let item = resolver.trigger(&job).await?;
        observer.queued(&item);

        let deadline = Instant::now() + self.policy.resolve_timeout;
        let build = resolver.resolve_build(&item, deadline, &mut cancel).await?;
        observer.started(
            &build,
            &build_url(client.base_url(), &job.job, build.number()),
        );

        if !request.follow {
            return Ok(RunOutcome {
                build,
                followed: false,
            });
        }

        let build = BuildMonitor::new(&client, self.policy)
            .run(build, cancel, |chunk| observer.output(chunk))
            .await?;
        info!(
            "Build '{}' #{} ended as {}",
            job.job,
            build.number(),
            build.state()
        );

        Ok(RunOutcome {
            build,
            followed: true,
        })
    }

    pub async fn jobs(&self, environment: &str) -> Result<Vec<JobSummary>> {
        let (_, client) = self.connect(environment)?;
        JobLister::new(&client).list_jobs().await
    }

    pub async fn builds(
        &self,
        environment: &str,
        job: &str,
        limit: usize,
    ) -> Result<Vec<BuildSummary>> {
        let (env, client) = self.connect(environment)?;
        let job = JobReference::new(env.name.clone(), job);
        JobLister::new(&client).list_builds(&job, limit).await
    }

    /// Stops build `number` of `job`, or its newest unfinished build when no
    /// number is given.
    pub async fn stop(
        &self,
        environment: &str,
        job: &str,
        number: Option<u64>,
    ) -> Result<StopReport> {
        let (env, client) = self.connect(environment)?;
        let job = JobReference::new(env.name.clone(), job);

        let build = match number {
            Some(number) => Build::new(job, number),
            None => {
                let summary = JobLister::new(&client)
                    .latest_running_build(&job)
                    .await?
                    .ok_or_else(|| JenkinsError::NoRunningBuild(job.job.clone()))?;
                let mut build = Build::new(job, summary.number);
                build.advance(summary.state);
                build
            }
        };

        let outcome = BuildMonitor::new(&client, self.policy).stop(&build).await?;
        Ok(StopReport { build, outcome })
    }

    pub fn set_environment(&mut self, environment: Environment) {
        info!("Saving Jenkins '{}'", environment.name);
        self.registry.set(environment);
    }

    pub fn use_environment(&mut self, name: &str) -> Result<()> {
        self.registry.set_default(name)
    }

    pub fn delete_environment(&mut self, name: &str) -> Result<Environment> {
        self.registry.delete(name)
    }
}
