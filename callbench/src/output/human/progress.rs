use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One progress bar for the tier currently running.
pub(crate) struct TierProgress {
    inner: Mutex<Option<ProgressBar>>,
}

impl TierProgress {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub(crate) fn begin(&self, prefix: String, duration: Duration) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(old) = inner.take() {
            old.finish_and_clear();
        }

        let pb = ProgressBar::with_draw_target(
            Some(duration.as_millis() as u64),
            ProgressDrawTarget::stderr_with_hz(5),
        );
        pb.set_style(bar_style());
        pb.set_prefix(prefix);
        *inner = Some(pb);
    }

    pub(crate) fn update(&self, elapsed: Duration, message: String) {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pb) = inner.as_ref() {
            let len = pb.length().unwrap_or(0);
            pb.set_position((elapsed.as_millis() as u64).min(len));
            pb.set_message(message);
        }
    }

    pub(crate) fn finish(&self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pb) = inner.take() {
            pb.finish_and_clear();
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}
