//! Cumulative pre-walk statistics.

use std::ops::Sub;

use serde::{Deserialize, Serialize};

/// Running totals for a pre-walk.
///
/// Values are passed by copy through the recursion: every step receives the
/// totals so far and hands back an updated copy. Every delivery through a
/// result callback is cumulative, never a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanStats {
    /// Number of regular files.
    pub files: u64,
    /// Number of directories.
    pub dirs: u64,
    /// Number of entries that are neither files nor directories.
    pub others: u64,
    /// Total size of regular files in bytes.
    pub bytes: u64,
}

impl ScanStats {
    /// Create zero-valued stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats with one more regular file of `size` bytes.
    #[must_use]
    pub fn with_file(self, size: u64) -> Self {
        Self {
            files: self.files + 1,
            bytes: self.bytes.saturating_add(size),
            ..self
        }
    }

    /// Stats with one more directory.
    #[must_use]
    pub fn with_dir(self) -> Self {
        Self {
            dirs: self.dirs + 1,
            ..self
        }
    }

    /// Stats with one more non-file, non-directory entry.
    #[must_use]
    pub fn with_other(self) -> Self {
        Self {
            others: self.others + 1,
            ..self
        }
    }

    /// Total number of counted entries.
    pub fn entries(&self) -> u64 {
        self.files + self.dirs + self.others
    }

    /// Whether nothing has been counted yet.
    pub fn is_empty(&self) -> bool {
        self.entries() == 0 && self.bytes == 0
    }
}

/// Difference between two cumulative snapshots, saturating at zero.
impl Sub for ScanStats {
    type Output = ScanStats;

    fn sub(self, earlier: ScanStats) -> ScanStats {
        ScanStats {
            files: self.files.saturating_sub(earlier.files),
            dirs: self.dirs.saturating_sub(earlier.dirs),
            others: self.others.saturating_sub(earlier.others),
            bytes: self.bytes.saturating_sub(earlier.bytes),
        }
    }
}
