use chrono::{DateTime, Local, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};
use std::time::Duration;

use crate::jenkins::{BuildState, BuildSummary, JobSummary};

/// Table and cell creation helpers
fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Maps a Jenkins ball colour (`blue`, `red_anime`, `disabled`, ...) to a status label.
fn job_status_cell(job: &JobSummary) -> Cell {
    let color = job.color.as_deref().unwrap_or("notbuilt");
    let base = color.strip_suffix("_anime").unwrap_or(color);

    let (label, fg) = match base {
        "blue" => ("SUCCESS", TableColor::Green),
        "red" => ("FAILURE", TableColor::Red),
        "yellow" => ("UNSTABLE", TableColor::Yellow),
        "aborted" => ("ABORTED", TableColor::DarkGrey),
        "disabled" => ("DISABLED", TableColor::DarkGrey),
        _ => ("NOT BUILT", TableColor::DarkGrey),
    };

    if job.is_building() {
        Cell::new(format!("{label} (building)")).fg(TableColor::Cyan)
    } else {
        Cell::new(label).fg(fg)
    }
}

fn build_state_cell(state: BuildState) -> Cell {
    let cell = Cell::new(state.to_string());
    match state {
        BuildState::Success => cell.fg(TableColor::Green),
        BuildState::Failure => cell.fg(TableColor::Red),
        BuildState::Queued | BuildState::Running => cell.fg(TableColor::Cyan),
        BuildState::Aborted | BuildState::Unknown => cell.fg(TableColor::DarkGrey),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    match seconds {
        0..=59 => format!("{seconds}s"),
        60..=3599 => format!("{}m {}s", seconds / 60, seconds % 60),
        _ => format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60),
    }
}

/// Local wall-clock time, as shown in the Jenkins UI.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn jobs_table(jobs: &[JobSummary]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["NAME", "STATUS"]);
    for job in jobs {
        table.add_row(vec![Cell::new(&job.name), job_status_cell(job)]);
    }
    table
}

pub fn builds_table(builds: &[BuildSummary]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["BUILD", "STATE", "STARTED", "DURATION"]);
    for build in builds {
        let started = build
            .started_at
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        let duration = build
            .duration
            .map(format_duration)
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(format!("#{}", build.number)),
            build_state_cell(build.state),
            Cell::new(started),
            Cell::new(duration),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(7260)), "2h 1m");
    }

    #[test]
    fn jobs_table_lists_every_job() {
        let jobs = vec![
            JobSummary {
                name: "app-build".into(),
                color: Some("blue".into()),
            },
            JobSummary {
                name: "deploy".into(),
                color: Some("red_anime".into()),
            },
        ];

        let rendered = jobs_table(&jobs).to_string();

        assert!(rendered.contains("app-build"));
        assert!(rendered.contains("SUCCESS"));
        assert!(rendered.contains("FAILURE (building)"));
    }

    #[test]
    fn builds_table_shows_missing_values_as_dash() {
        let builds = vec![BuildSummary {
            number: 18,
            state: BuildState::Running,
            started_at: None,
            duration: None,
        }];

        let rendered = builds_table(&builds).to_string();

        assert!(rendered.contains("#18"));
        assert!(rendered.contains("RUNNING"));
        assert!(rendered.contains('-'));
    }
}
