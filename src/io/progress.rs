//! Terminal progress display for a running simulation

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::LazyLock;

static STEP_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] Steps: [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Single progress bar over the configured step count
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    /// Create a bar for the given number of steps
    pub fn new(total_steps: u64) -> Self {
        let bar = ProgressBar::new(total_steps);
        bar.set_style(STEP_STYLE.clone());
        Self { bar }
    }

    /// Advance by one performed step
    pub fn step(&self) {
        self.bar.inc(1);
    }

    /// Finish normally after all steps ran
    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }

    /// Finish early because no moves remain
    pub fn finish_exhausted(&self) {
        self.bar.abandon_with_message("no eligible moves remain");
    }
}
