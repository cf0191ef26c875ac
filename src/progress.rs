//! Progress bar for the provisioning sequence

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One bar across all steps, drawn on stderr
///
/// indicatif hides the bar when stderr is not a terminal, so container logs
/// only see the tracing output.
pub struct StepProgress {
    bar: ProgressBar,
}

impl StepProgress {
    pub fn new(total_steps: usize) -> Self {
        Self::with_target(total_steps, ProgressDrawTarget::stderr())
    }

    /// Progress that never draws, for JSON logs and tests
    pub fn hidden(total_steps: usize) -> Self {
        Self::with_target(total_steps, ProgressDrawTarget::hidden())
    }

    fn with_target(total_steps: usize, target: ProgressDrawTarget) -> Self {
        let style = ProgressStyle::default_bar()
            .template("[{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bar = ProgressBar::with_draw_target(Some(total_steps as u64), target);
        bar.set_style(style);
        Self { bar }
    }

    /// Show the step about to be checked or executed
    pub fn start_step(&self, name: &str, index: usize) {
        let total = self.bar.length().unwrap_or(0);
        self.bar.set_message(format!("({}/{total}) {name}", index + 1));
    }

    pub fn finish_step(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("provisioning complete");
    }

    /// Leave the bar where it stopped after a failure
    pub fn abandon(&self) {
        self.bar.abandon();
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}
