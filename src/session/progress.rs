use tracing::debug;

/// Shows and hides a blocking "work in progress" notice.
pub trait ProgressIndicator {
    fn show(&self, message: &str);
    fn hide(&self);
}

/// Keeps the indicator visible until dropped.
#[must_use = "the indicator is hidden as soon as the guard is dropped"]
pub struct ProgressGuard<'a> {
    indicator: &'a dyn ProgressIndicator,
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        debug!("Releasing progress indicator");
        self.indicator.hide();
    }
}

pub fn activate<'a>(indicator: &'a dyn ProgressIndicator, message: &str) -> ProgressGuard<'a> {
    debug!(message, "Activating progress indicator");
    indicator.show(message);
    ProgressGuard { indicator }
}

/// Indicator that only logs. Used for `--json` runs, whose output is read
/// by scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressIndicator for LogProgress {
    fn show(&self, message: &str) {
        tracing::info!(message, "Progress started");
    }

    fn hide(&self) {
        tracing::info!("Progress finished");
    }
}
