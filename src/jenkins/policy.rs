use std::time::Duration;

use log::warn;

use crate::error::{JenkinsError, Result};

/// Timing and retry limits shared by the queue resolver and the build monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub resolve_timeout: Duration,
    pub max_transient_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            resolve_timeout: Duration::from_secs(600),
            max_transient_failures: 3,
        }
    }
}

/// Counts consecutive transient failures of a polling loop.
///
/// Up to `limit` failures in a row are tolerated; any successful poll resets
/// the streak.
#[derive(Debug)]
pub(crate) struct FailureStreak {
    limit: u32,
    current: u32,
}

impl FailureStreak {
    pub fn new(limit: u32) -> Self {
        Self { limit, current: 0 }
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    /// Records a failed poll. Non-transient errors and a streak past the limit
    /// are handed back to the caller.
    pub fn record(&mut self, error: JenkinsError) -> Result<()> {
        if !error.is_transient() {
            return Err(error);
        }

        self.current += 1;
        if self.current > self.limit {
            return Err(error);
        }

        warn!("{error}, retrying ({}/{})...", self.current, self.limit);
        Ok(())
    }
}
