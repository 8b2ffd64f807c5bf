use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::bright;

/// Spinner shown on stderr while a queue item waits for a build number.
///
/// The line is cleared when the spinner is dropped, so error paths leave no
/// stale spinner behind.
pub struct QueueSpinner {
    pb: ProgressBar,
}

impl QueueSpinner {
    pub fn start(job: &str, queue_id: u64) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.yellow} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!(
            "{} is waiting in the queue (item {queue_id})",
            bright(job)
        ));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { pb }
    }
}

impl Drop for QueueSpinner {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}
