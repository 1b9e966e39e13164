use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared progress and cancellation handle for one update run.
///
/// Cancellation is cooperative: the download checks the flag at chunk
/// boundaries, the install swap never does.
pub struct UpdateProgress {
    bar: ProgressBar,
    cancelled: AtomicBool,
}

impl UpdateProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: ProgressBar::new(0),
            cancelled: AtomicBool::new(false),
        })
    }

    /// A handle whose bar draws nothing. For quiet mode and tests.
    pub fn hidden() -> Arc<Self> {
        Arc::new(Self {
            bar: ProgressBar::hidden(),
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn start_download(&self, total_bytes: u64, file_name: &str) {
        self.bar.set_length(total_bytes);
        self.bar.set_position(0);
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.bar.set_message(format!("Downloading {}", file_name));
    }

    pub fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    pub fn finish_download(&self) {
        self.bar.finish_with_message("Download complete");
    }

    pub fn abandon(&self) {
        self.bar.abandon_with_message("Cancelled");
    }
}
