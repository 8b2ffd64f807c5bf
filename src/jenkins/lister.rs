use crate::error::{JenkinsError, Result};

use super::api::JenkinsApi;
use super::types::{BuildSummary, JobReference, JobSummary};

/// Number of builds shown by `jj get JOB` when no limit is given.
pub const DEFAULT_BUILD_LIMIT: usize = 20;

/// Enumerates jobs and builds. Every call goes to Jenkins; nothing is cached.
pub struct JobLister<'a, A> {
    api: &'a A,
}

impl<'a, A: JenkinsApi> JobLister<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Top-level jobs sorted by name.
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let mut jobs = self.api.list_jobs().await?;
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(jobs)
    }

    /// Most recent builds of a job, newest first.
    pub async fn list_builds(&self, job: &JobReference, limit: usize) -> Result<Vec<BuildSummary>> {
        let mut builds = self
            .api
            .list_builds(&job.job, limit)
            .await
            .map_err(|e| match e {
                JenkinsError::NotFound { .. } => JenkinsError::JobNotFound(job.job.clone()),
                other => other,
            })?;
        builds.sort_by(|a, b| b.number.cmp(&a.number));
        builds.truncate(limit);
        Ok(builds)
    }

    /// The newest build that is still queued or running, if any.
    pub async fn latest_running_build(&self, job: &JobReference) -> Result<Option<BuildSummary>> {
        let builds = self.list_builds(job, DEFAULT_BUILD_LIMIT).await?;
        Ok(builds.into_iter().find(|build| !build.state.is_terminal()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jenkins::testing::ScriptedJenkins;
    use crate::jenkins::types::BuildState;

    fn summary(number: u64, state: BuildState) -> BuildSummary {
        BuildSummary {
            number,
            state,
            started_at: None,
            duration: None,
        }
    }

    fn job(name: &str, color: &str) -> JobSummary {
        JobSummary {
            name: name.into(),
            color: Some(color.into()),
        }
    }

    #[tokio::test]
    async fn jobs_are_sorted_by_name() {
        let api = ScriptedJenkins::default();
        api.set_jobs(vec![job("web-build", "blue"), job("app-build", "red")]);

        let jobs = JobLister::new(&api).list_jobs().await.unwrap();

        assert_eq!(
            jobs.iter().map(|j| j.name.as_str()).collect::<Vec<_>>(),
            vec!["app-build", "web-build"]
        );
    }

    #[tokio::test]
    async fn listing_is_fresh_on_every_call() {
        let api = ScriptedJenkins::default();
        let lister = JobLister::new(&api);

        api.set_jobs(vec![job("app-build", "blue")]);
        assert_eq!(lister.list_jobs().await.unwrap().len(), 1);

        api.set_jobs(vec![job("app-build", "blue"), job("deploy", "notbuilt")]);
        assert_eq!(lister.list_jobs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn builds_newest_first_and_limited() {
        let api = ScriptedJenkins::default();
        api.set_builds(vec![
            summary(15, BuildState::Success),
            summary(17, BuildState::Running),
            summary(16, BuildState::Failure),
        ]);

        let builds = JobLister::new(&api)
            .list_builds(&JobReference::new("dev", "app-build"), 2)
            .await
            .unwrap();

        assert_eq!(
            builds.iter().map(|b| b.number).collect::<Vec<_>>(),
            vec![17, 16]
        );
    }

    #[tokio::test]
    async fn latest_running_build_skips_finished_ones() {
        let api = ScriptedJenkins::default();
        api.set_builds(vec![
            summary(18, BuildState::Aborted),
            summary(17, BuildState::Running),
            summary(16, BuildState::Running),
        ]);

        let running = JobLister::new(&api)
            .latest_running_build(&JobReference::new("dev", "app-build"))
            .await
            .unwrap();

        assert_eq!(running.map(|b| b.number), Some(17));
    }

    #[test]
    fn no_running_build() {
        let api = ScriptedJenkins::default();
        api.set_builds(vec![summary(18, BuildState::Success)]);

        let running = tokio_test::block_on(
            JobLister::new(&api).latest_running_build(&JobReference::new("dev", "app-build")),
        );

        assert!(tokio_test::assert_ok!(running).is_none());
    }
}
