//! Terminal progress rendering for downloads.
//!
//! [`DownloadProgress`] is the CLI-side implementation of
//! [`ProgressSink`](crate::fetcher::ProgressSink): the fetcher pushes byte
//! counts into it, and all display state - the lazily created `indicatif`
//! bar - lives here. Downloads below the 1 MiB display threshold and runs
//! with progress disabled render nothing at all.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

use crate::constants::STREAM_THRESHOLD;
use crate::fetcher::ProgressSink;

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{bytes}/{total_bytes} [{bar:60.cyan/blue}] {percent:>3}%")
        .unwrap()
        .progress_chars("▓░")
}

/// Progress bar for a single download.
pub struct DownloadProgress {
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl DownloadProgress {
    /// Create a progress renderer; `enabled` is false for `--no-progress`
    /// and quiet runs.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            enabled,
        }
    }

    /// Finish and clear the bar, if one was ever drawn.
    pub fn finish(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish();
                eprintln!();
            }
        }
    }
}

impl ProgressSink for DownloadProgress {
    fn report(&self, bytes_total: u64, bytes_so_far: u64) {
        // The bar is only worth drawing for payloads above the threshold
        if !self.enabled || bytes_total < STREAM_THRESHOLD {
            return;
        }

        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new(bytes_total);
            bar.set_style(download_style());
            bar
        });
        bar.set_position(bytes_so_far.min(bytes_total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_progress_never_creates_a_bar() {
        let progress = DownloadProgress::new(false);
        progress.report(10 * 1024 * 1024, 1024);
        assert!(progress.bar.lock().expect("lock").is_none());
        progress.finish();
    }

    #[test]
    fn small_downloads_render_nothing() {
        let progress = DownloadProgress::new(true);
        progress.report(512 * 1024, 1024);
        assert!(progress.bar.lock().expect("lock").is_none());
    }

    #[test]
    fn large_downloads_create_and_advance_a_bar() {
        let progress = DownloadProgress::new(true);
        progress.report(4 * 1024 * 1024, 1024);
        progress.report(4 * 1024 * 1024, 2048);

        {
            let guard = progress.bar.lock().expect("lock");
            let bar = guard.as_ref().expect("bar exists");
            assert_eq!(bar.position(), 2048);
        }
        progress.finish();
        assert!(progress.bar.lock().expect("lock").is_none());
    }
}
