//! Core types and traits for prewalk.
//!
//! This crate provides the data structures shared by the pre-walk engine:
//! cumulative statistics, lazily resolved entries, the logical target tree,
//! errors and configuration.

mod config;
mod error;
mod node;
mod stats;
mod tree;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use node::{EntryKind, Filesystem, LazyMetadata, compare_names, sort_by_name};
pub use stats::ScanStats;
pub use tree::{TargetTree, path_components};
