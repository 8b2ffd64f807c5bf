mod console;
mod progress;
mod styling;
mod tables;

pub use console::ConsoleObserver;
pub use styling::bright_red;

use crate::jenkins::{Build, BuildSummary, JobSummary, StopOutcome};
use crate::orchestrator::{RunOutcome, StopReport};
use crate::registry::EnvironmentRegistry;

use styling::{bright, build_state, cyan, dim};
use tables::{builds_table, format_duration, format_timestamp, jobs_table};

/// Prints the final state of a followed build to stderr.
pub fn print_run_outcome(outcome: &RunOutcome) {
    let build = &outcome.build;
    if !outcome.followed {
        eprintln!(
            "{} {}",
            bright(format!("{} #{}", build.job.job, build.number())),
            dim("started, not following")
        );
        return;
    }

    if !build.is_terminal() {
        eprintln!(
            "\n{} {}",
            dim("Detached, the build keeps running. Stop it with"),
            cyan(format!("jj stop {} {}", build.job.job, build.number()))
        );
        return;
    }

    eprintln!(
        "\n{} {}{}",
        bright(format!("{} #{}", build.job.job, build.number())),
        build_state(build.state()),
        dim(timing_note(build))
    );
}

/// `" in 2m 5s, started 2024-01-02 10:00:00"`, or whatever part Jenkins reported.
fn timing_note(build: &Build) -> String {
    let duration = build
        .duration
        .map(|d| format!(" in {}", format_duration(d)))
        .unwrap_or_default();
    let started = build
        .started_at
        .map(|t| format!(", started {}", format_timestamp(t)))
        .unwrap_or_default();
    format!("{duration}{started}")
}

/// Lists jobs as a table, or one bare name per line for shell completion.
pub fn print_jobs(jobs: &[JobSummary], no_headers: bool) {
    if no_headers {
        for job in jobs {
            println!("{}", job.name);
        }
    } else {
        println!("{}", jobs_table(jobs));
    }
}

pub fn print_builds(builds: &[BuildSummary], no_headers: bool) {
    if no_headers {
        for build in builds {
            println!("{}", build.number);
        }
    } else {
        println!("{}", builds_table(builds));
    }
}

pub fn print_environments(registry: &EnvironmentRegistry, no_headers: bool) {
    if no_headers {
        for name in registry.list() {
            println!("{name}");
        }
        return;
    }
    if registry.is_empty() {
        eprintln!(
            "{}",
            dim("No Jenkins configured yet, add one with 'jj set NAME'")
        );
        return;
    }

    for env in registry.environments() {
        if env.is_default {
            println!("* {} {}", bright(&env.name), dim(&env.url));
        } else {
            println!("  {} {}", env.name, dim(&env.url));
        }
    }
}

pub fn print_stop(report: &StopReport) {
    let build = &report.build;
    let label = bright(format!("{} #{}", build.job.job, build.number()));
    let note = match report.outcome {
        StopOutcome::Requested => "stop requested",
        StopOutcome::AlreadyFinished => "has already finished",
    };
    eprintln!("{label} {}", dim(note));
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::jenkins::JobReference;

    #[test]
    fn timing_note_shows_duration_and_start() {
        let mut build = Build::new(JobReference::new("dev", "app-build"), 17);
        build.duration = Some(Duration::from_secs(125));
        build.started_at = Utc.timestamp_opt(1_700_000_000, 0).single();

        let note = timing_note(&build);

        assert!(note.starts_with(" in 2m 5s, started 2023-11-1"), "{note}");
    }

    #[test]
    fn timing_note_is_empty_without_timing() {
        let build = Build::new(JobReference::new("dev", "app-build"), 17);
        assert_eq!(timing_note(&build), "");
    }
}
