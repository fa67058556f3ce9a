//! Convenient utility functions.

#[cfg(feature = "progress_bar")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "progress_bar")]
use std::time::Duration;

/// Receives progress notifications from the long running stages of the attack.
///
/// All methods default to doing nothing.
pub trait Progress: Sync {
    /// A stage named `stage` begins and will report `len` steps.
    fn start(&self, _stage: &str, _len: usize) {}

    /// `delta` steps of the current stage are done.
    fn inc(&self, _delta: usize) {}

    /// The current stage is done.
    fn finish(&self) {}
}

/// A [`Progress`] that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

#[cfg(feature = "progress_bar")]
impl Progress for ProgressBar {
    fn start(&self, stage: &str, len: usize) {
        self.reset();
        self.set_length(len as u64);
        self.set_message(stage.to_string());
    }

    fn inc(&self, delta: usize) {
        ProgressBar::inc(self, delta as u64);
    }

    fn finish(&self) {
        ProgressBar::finish(self);
    }
}

/// Creates a [`ProgressBar`] with a predefined default style.
#[cfg(feature = "progress_bar")]
pub fn progress_bar(len: usize) -> ProgressBar {
    let progress_bar = ProgressBar::new(len as u64).with_style(
        ProgressStyle::with_template("{msg} {elapsed_precise} {wide_bar} {pos}/{len} ({eta})")
            .unwrap(),
    );
    progress_bar.enable_steady_tick(Duration::new(0, 100000000));
    progress_bar
}
