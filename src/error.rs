use std::time::Duration;

use thiserror::Error;

/// Failure classes surfaced to the command layer.
///
/// Every [`JenkinsError`] belongs to exactly one kind; the kind decides the
/// process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Authentication,
    NotFound,
    TransientNetwork,
    RemoteServer,
    ResolutionTimeout,
    BuildAborted,
    MonitorUnreachable,
    Interrupted,
    Unexpected,
}

#[derive(Error, Debug)]
pub enum JenkinsError {
    #[error("There are no Jenkins environments configured. Use 'jj set NAME' to add one")]
    NoEnvironmentsConfigured,

    #[error("Jenkins '{0}' is not found")]
    EnvironmentNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Jenkins rejected the credentials for {url}")]
    Unauthorized { url: String },

    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Job '{0}' is not found")]
    JobNotFound(String),

    #[error("Build #{number} of job '{job}' is not found")]
    BuildNotFound { job: String, number: u64 },

    #[error("Job '{0}' has no running build")]
    NoRunningBuild(String),

    #[error("Jenkins is unreachable: {0}")]
    Unreachable(String),

    #[error("Jenkins server error (status {status}) for {url}")]
    ServerError { status: u16, url: String },

    #[error("Unexpected response (status {status}) for {url}")]
    Unexpected { status: u16, url: String },

    #[error("Invalid response from Jenkins: {0}")]
    InvalidResponse(String),

    #[error("Queue item {queue_id} was not assigned a build within {}s", waited.as_secs())]
    ResolutionTimeout { queue_id: u64, waited: Duration },

    #[error("Queue item {queue_id} was cancelled before it started")]
    BuildAborted { queue_id: u64 },

    #[error("Lost contact with Jenkins while following '{job}' #{number} ({failures} consecutive failures)")]
    MonitorUnreachable {
        job: String,
        number: u64,
        failures: u32,
    },

    #[error("Stopped waiting for queue item {queue_id}; Jenkins may still start the build")]
    Interrupted { queue_id: u64 },
}

impl JenkinsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoEnvironmentsConfigured | Self::EnvironmentNotFound(_) | Self::Config(_) => {
                ErrorKind::Configuration
            }
            Self::Unauthorized { .. } => ErrorKind::Authentication,
            Self::NotFound { .. }
            | Self::JobNotFound(_)
            | Self::BuildNotFound { .. }
            | Self::NoRunningBuild(_) => ErrorKind::NotFound,
            Self::Unreachable(_) => ErrorKind::TransientNetwork,
            Self::ServerError { .. } => ErrorKind::RemoteServer,
            Self::ResolutionTimeout { .. } => ErrorKind::ResolutionTimeout,
            Self::BuildAborted { .. } => ErrorKind::BuildAborted,
            Self::MonitorUnreachable { .. } => ErrorKind::MonitorUnreachable,
            Self::Interrupted { .. } => ErrorKind::Interrupted,
            Self::Unexpected { .. } | Self::InvalidResponse(_) => ErrorKind::Unexpected,
        }
    }

    /// Whether a polling loop may count this failure against its transient streak
    /// instead of giving up immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TransientNetwork | ErrorKind::RemoteServer
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Configuration => 2,
            ErrorKind::Authentication => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::TransientNetwork | ErrorKind::MonitorUnreachable => 5,
            ErrorKind::RemoteServer => 6,
            ErrorKind::ResolutionTimeout => 7,
            ErrorKind::BuildAborted => crate::orchestrator::BUILD_ABORTED_EXIT_CODE,
            ErrorKind::Interrupted => crate::orchestrator::DETACHED_EXIT_CODE,
            ErrorKind::Unexpected => 9,
        }
    }
}

impl From<reqwest::Error> for JenkinsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Unreachable(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, JenkinsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_network_and_server_failures() {
        assert!(JenkinsError::Unreachable("connection refused".into()).is_transient());
        assert!(JenkinsError::ServerError {
            status: 502,
            url: "http://ci/".into()
        }
        .is_transient());
        assert!(!JenkinsError::JobNotFound("nope".into()).is_transient());
        assert!(!JenkinsError::Unauthorized {
            url: "http://ci/".into()
        }
        .is_transient());
    }

    #[test]
    fn every_failure_has_a_non_zero_exit_code() {
        let errors = [
            JenkinsError::NoEnvironmentsConfigured,
            JenkinsError::EnvironmentNotFound("prod".into()),
            JenkinsError::JobNotFound("nope".into()),
            JenkinsError::ResolutionTimeout {
                queue_id: 42,
                waited: Duration::from_secs(1),
            },
            JenkinsError::BuildAborted { queue_id: 42 },
            JenkinsError::MonitorUnreachable {
                job: "app".into(),
                number: 1,
                failures: 4,
            },
            JenkinsError::Interrupted { queue_id: 42 },
        ];

        for error in errors {
            assert_ne!(error.exit_code(), 0, "{error} must not exit with 0");
        }
    }

    #[test]
    fn interrupted_wait_exits_like_a_detached_follow() {
        let error = JenkinsError::Interrupted { queue_id: 42 };
        assert_eq!(error.kind(), ErrorKind::Interrupted);
        assert_eq!(error.exit_code(), crate::orchestrator::DETACHED_EXIT_CODE);
        assert!(!error.is_transient());
    }

    #[test]
    fn configuration_errors_share_a_kind() {
        assert_eq!(
            JenkinsError::NoEnvironmentsConfigured.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            JenkinsError::EnvironmentNotFound("x".into()).kind(),
            ErrorKind::Configuration
        );
    }
}
