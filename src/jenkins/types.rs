use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// What to trigger or inspect: a job on a named environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReference {
    pub environment: String,
    pub job: String,
    pub parameters: BTreeMap<String, String>,
}

impl JobReference {
    pub fn new(environment: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            job: job.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A build request accepted by Jenkins that has no build number yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub id: u64,
    pub job: JobReference,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Queued,
    Running,
    Success,
    Failure,
    Aborted,
    /// Not observed yet, e.g. a build addressed by number before its first status
    Unknown,
}

impl BuildState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Aborted)
    }

    /// Maps the `building` flag and `result` field of a Jenkins build.
    pub fn from_jenkins(building: bool, result: Option<&str>) -> Self {
        if building {
            return Self::Running;
        }

        match result {
            None => Self::Queued,
            Some("SUCCESS") => Self::Success,
            Some("ABORTED" | "NOT_BUILT") => Self::Aborted,
            // FAILURE, UNSTABLE and anything newer Jenkins versions invent
            Some(_) => Self::Failure,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Queued => 1,
            Self::Running => 2,
            Self::Success | Self::Failure | Self::Aborted => 3,
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Aborted => "ABORTED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(text)
    }
}

/// A numbered execution of a job, tracked for the lifetime of one command.
///
/// The log offset is the number of console bytes already handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    pub job: JobReference,
    number: u64,
    state: BuildState,
    log_offset: u64,
    log_complete: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

impl Build {
    pub fn new(job: JobReference, number: u64) -> Self {
        Self {
            job,
            number,
            state: BuildState::Unknown,
            log_offset: 0,
            log_complete: false,
            started_at: None,
            duration: None,
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn log_offset(&self) -> u64 {
        self.log_offset
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// True once the build is terminal and Jenkins reported no further log data.
    pub fn is_finished(&self) -> bool {
        self.is_terminal() && self.log_complete
    }

    /// Moves the state forward. Regressions (e.g. Running after Success) are ignored.
    pub fn advance(&mut self, next: BuildState) -> bool {
        if self.state.is_terminal() || next.rank() <= self.state.rank() {
            return false;
        }
        self.state = next;
        true
    }

    pub(crate) fn apply_status(&mut self, status: &BuildStatus) {
        self.advance(status.state);
        if status.started_at.is_some() {
            self.started_at = status.started_at;
        }
        if status.duration.is_some() {
            self.duration = status.duration;
        }
    }

    pub(crate) fn consume_log(&mut self, chunk: &LogChunk) {
        self.log_offset = chunk.next_offset.max(self.log_offset);
        // Jenkins may report no more data between two writes of a running build
        self.log_complete = self.is_terminal() && !chunk.more_data;
    }
}

/// Where a queue item stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueState {
    Waiting { why: Option<String> },
    Cancelled,
    Assigned { number: u64 },
}

/// Snapshot of a build's status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStatus {
    pub state: BuildState,
    pub started_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

/// A slice of console output starting at the requested offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub data: Vec<u8>,
    pub next_offset: u64,
    pub more_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub name: String,
    /// Jenkins ball colour, e.g. `blue`, `red_anime`
    pub color: Option<String>,
}

impl JobSummary {
    pub fn is_building(&self) -> bool {
        self.color
            .as_deref()
            .is_some_and(|color| color.ends_with("_anime"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub number: u64,
    pub state: BuildState,
    pub started_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> Build {
        Build::new(JobReference::new("dev", "app-build"), 17)
    }

    #[test]
    fn maps_jenkins_results() {
        assert_eq!(BuildState::from_jenkins(true, None), BuildState::Running);
        assert_eq!(BuildState::from_jenkins(false, None), BuildState::Queued);
        assert_eq!(
            BuildState::from_jenkins(false, Some("SUCCESS")),
            BuildState::Success
        );
        assert_eq!(
            BuildState::from_jenkins(false, Some("UNSTABLE")),
            BuildState::Failure
        );
        assert_eq!(
            BuildState::from_jenkins(false, Some("NOT_BUILT")),
            BuildState::Aborted
        );
        assert_eq!(
            BuildState::from_jenkins(false, Some("ABORTED")),
            BuildState::Aborted
        );
    }

    #[test]
    fn state_only_moves_forward() {
        let mut build = build();
        assert!(build.advance(BuildState::Running));
        assert!(!build.advance(BuildState::Queued));
        assert!(build.advance(BuildState::Success));
        assert!(!build.advance(BuildState::Running));
        assert!(!build.advance(BuildState::Failure));
        assert_eq!(build.state(), BuildState::Success);
    }

    #[test]
    fn new_build_is_unknown_until_a_status_arrives() {
        let mut build = build();
        assert_eq!(build.state(), BuildState::Unknown);
        assert!(!build.is_terminal());

        build.apply_status(&BuildStatus {
            state: BuildState::Queued,
            started_at: None,
            duration: None,
        });
        assert_eq!(build.state(), BuildState::Queued);
    }

    #[test]
    fn unknown_never_overrides_a_known_state() {
        let mut build = build();
        build.advance(BuildState::Running);
        assert!(!build.advance(BuildState::Unknown));
        assert_eq!(build.state(), BuildState::Running);
    }

    #[test]
    fn log_offset_never_moves_backwards() {
        let mut build = build();
        build.consume_log(&LogChunk {
            data: b"Building...\n".to_vec(),
            next_offset: 12,
            more_data: true,
        });
        build.consume_log(&LogChunk {
            data: Vec::new(),
            next_offset: 0,
            more_data: true,
        });
        assert_eq!(build.log_offset(), 12);
    }

    #[test]
    fn finished_needs_terminal_state_and_complete_log() {
        let mut build = build();
        build.advance(BuildState::Success);
        assert!(!build.is_finished());

        build.consume_log(&LogChunk {
            data: Vec::new(),
            next_offset: 0,
            more_data: false,
        });
        assert!(build.is_finished());
    }

    #[test]
    fn log_is_not_complete_while_running() {
        let mut build = build();
        build.advance(BuildState::Running);
        build.consume_log(&LogChunk {
            data: b"Building...\n".to_vec(),
            next_offset: 12,
            more_data: false,
        });
        build.advance(BuildState::Success);
        assert!(!build.is_finished());
    }

    #[test]
    fn job_summary_detects_building_colour() {
        let job = JobSummary {
            name: "app".into(),
            color: Some("blue_anime".into()),
        };
        assert!(job.is_building());
    }
}
