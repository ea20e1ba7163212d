//! Scan progress reporting.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use prewalk_core::ScanStats;

/// Capacity of the progress broadcast channel.
pub const PROGRESS_CHANNEL_SIZE: usize = 100;

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Cumulative stats so far.
    pub stats: ScanStats,
    /// Entry that was just finished. Empty for the final report.
    pub current_path: PathBuf,
    /// Time elapsed since the callback was created.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            stats: ScanStats::new(),
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Whether this is the final report of a scan.
    pub fn is_final(&self) -> bool {
        self.current_path.as_os_str().is_empty()
    }

    /// Calculate scan rate in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.stats.entries() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate scan rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.stats.bytes as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns `on_result` notifications into broadcast progress messages.
///
/// Intermediate reports are throttled to one per interval. The final report
/// (empty path) is always sent.
#[derive(Debug)]
pub struct ProgressReporter {
    progress_tx: broadcast::Sender<ScanProgress>,
    interval: Duration,
}

impl ProgressReporter {
    /// Create a reporter that sends at most one intermediate report per
    /// `interval`.
    pub fn new(interval: Duration) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self {
            progress_tx,
            interval,
        }
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// A result callback that feeds this reporter's channel.
    ///
    /// The callback keeps the channel open; receivers see it close once the
    /// reporter and every callback have been dropped.
    pub fn callback(&self) -> impl FnMut(&Path, ScanStats) + Send + use<> {
        let tx = self.progress_tx.clone();
        let interval = self.interval;
        let start = Instant::now();
        let mut last_sent: Option<Instant> = None;

        move |path: &Path, stats: ScanStats| {
            let now = Instant::now();
            let is_final = path.as_os_str().is_empty();
            if !is_final && last_sent.is_some_and(|t| now.duration_since(t) < interval) {
                return;
            }
            last_sent = Some(now);

            // No receivers is fine.
            let _ = tx.send(ScanProgress {
                stats,
                current_path: path.to_path_buf(),
                elapsed: now.duration_since(start),
            });
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}
