use std::io::Write;

use log::warn;
use url::Url;

use crate::jenkins::{Build, QueueItem};
use crate::orchestrator::RunObserver;

use super::progress::QueueSpinner;
use super::styling::{bright, cyan, dim};

/// Renders `jj run` progress: queue spinner on stderr, console log on stdout.
#[derive(Default)]
pub struct ConsoleObserver {
    spinner: Option<QueueSpinner>,
}

impl RunObserver for ConsoleObserver {
    fn queued(&mut self, item: &QueueItem) {
        self.spinner = Some(QueueSpinner::start(&item.job.job, item.id));
    }

    fn started(&mut self, build: &Build, url: &Url) {
        self.spinner = None;
        eprintln!(
            "{} {} {}",
            bright(format!("{} #{}", build.job.job, build.number())),
            dim("started on"),
            cyan(&build.job.environment)
        );
        eprintln!("  {}\n", dim(url));
    }

    fn output(&mut self, chunk: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(chunk).and_then(|()| stdout.flush()) {
            warn!("Failed to write console output: {e}");
        }
    }
}
