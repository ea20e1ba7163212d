//! Lazily resolved filesystem entries.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Classification of an entry after its metadata has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Anything else: symbolic links, devices, sockets, pipes.
    Other,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// One filesystem entry whose expensive metadata is fetched on demand.
///
/// `name` and `path` are always cheap. `kind` and `size` are only meaningful
/// after a successful [`init`](LazyMetadata::init); implementations must not
/// perform any stat before that call and must not re-stat after it.
pub trait LazyMetadata: Sized {
    /// Base name of the entry.
    fn name(&self) -> &str;

    /// Full path of the entry as given.
    fn path(&self) -> &Path;

    /// Read the entry's metadata. Called at most once per entry per scan.
    fn init(&mut self) -> Result<(), ScanError>;

    /// Entry classification. Only valid after `init`.
    fn kind(&self) -> EntryKind;

    /// Size in bytes. Only meaningful for regular files after `init`.
    fn size(&self) -> u64;

    /// List the entries of a directory, in no particular order.
    fn children(&self) -> Result<Vec<Self>, ScanError>;

    /// Uninitialized entry for the absolute form of this entry's path.
    fn absolute(&self) -> Result<Self, ScanError>;

    /// Uninitialized entry from the same provider for another path.
    fn with_path(&self, path: &Path) -> Self;
}

/// Filesystem access capability that produces lazy entries from raw paths.
pub trait Filesystem {
    /// Entry type handed out by this filesystem.
    type Entry: LazyMetadata + Send + 'static;

    /// Uninitialized entry for `path`. Must not touch the disk.
    fn entry(&self, path: &Path) -> Self::Entry;
}

/// Sibling order used at every level of a walk.
///
/// Names compare case-insensitively first; ties fall back to byte order so
/// the order is total ("a" < "B" < "c", and "A" < "a"). Plain byte order
/// would put "B" before "a", so this deliberately differs from it.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// Sort entries in place by [`compare_names`].
pub fn sort_by_name<M: LazyMetadata>(entries: &mut [M]) {
    entries.sort_by(|a, b| compare_names(a.name(), b.name()));
}
