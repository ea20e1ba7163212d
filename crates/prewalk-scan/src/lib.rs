//! Target pre-walk engine for prewalk.
//!
//! This crate walks a set of backup targets before the real work starts,
//! counting files, directories and other entries plus the total file size.
//!
//! # Overview
//!
//! - **Two-level walk**: targets are merged into a logical tree first, then
//!   the real filesystem below every leaf is walked
//! - **Deterministic order** at both levels, independent of readdir order
//! - **Pluggable policies** for name filtering, post-stat filtering, error
//!   handling and progress reporting
//! - **Cooperative cancellation** through a `CancellationToken`
//!
//! # Example
//!
//! ```rust,no_run
//! use prewalk_scan::{LocalFs, Scanner};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut scanner = Scanner::new(LocalFs)
//!     .with_select_by_name(|name| name != "target")
//!     .with_on_result(|path, stats| {
//!         if path.as_os_str().is_empty() {
//!             println!("done: {} files", stats.files);
//!         }
//!     });
//!
//! let stats = scanner
//!     .scan_paths(&CancellationToken::new(), ["/home/user/src"])
//!     .unwrap();
//! println!("Total size: {} bytes", stats.bytes);
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use prewalk_scan::{LocalFs, ProgressReporter, Scanner};
//!
//! let reporter = ProgressReporter::default();
//! let mut progress_rx = reporter.subscribe();
//! let scanner = Scanner::new(LocalFs).with_on_result(reporter.callback());
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("{} entries", progress.stats.entries());
//!     }
//! });
//! ```

mod local;
mod policy;
mod progress;
mod scanner;

pub use local::{LocalEntry, LocalFs};
pub use policy::{NameFilter, SizeLimit, WarningLog};
pub use progress::{PROGRESS_CHANNEL_SIZE, ProgressReporter, ScanProgress};
pub use scanner::{ErrorFn, ResultFn, Scanner, SelectByNameFn, SelectFn};

// Re-export core types for convenience
pub use prewalk_core::{
    EntryKind, Filesystem, LazyMetadata, ScanConfig, ScanError, ScanStats, ScanWarning,
    TargetTree, WarningKind,
};
