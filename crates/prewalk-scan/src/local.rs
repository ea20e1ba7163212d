//! Local filesystem provider.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use jwalk::{Parallelism, WalkDir};

use prewalk_core::{EntryKind, Filesystem, LazyMetadata, ScanError};

/// The local filesystem, accessed through `std::fs` and jwalk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    type Entry = LocalEntry;

    fn entry(&self, path: &Path) -> LocalEntry {
        LocalEntry::new(path)
    }
}

/// A local path whose metadata is read on `init`.
///
/// Metadata comes from `symlink_metadata`, so symbolic links are classified
/// as [`EntryKind::Other`] and never followed.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    path: PathBuf,
    name: CompactString,
    metadata: Option<Metadata>,
}

impl LocalEntry {
    /// Create an uninitialized entry.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = match path.file_name() {
            Some(name) => CompactString::new(name.to_string_lossy()),
            None => CompactString::new(path.to_string_lossy()),
        };
        Self {
            path,
            name,
            metadata: None,
        }
    }
}

impl LazyMetadata for LocalEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn init(&mut self) -> Result<(), ScanError> {
        let metadata =
            std::fs::symlink_metadata(&self.path).map_err(|e| ScanError::io(&self.path, e))?;
        self.metadata = Some(metadata);
        Ok(())
    }

    fn kind(&self) -> EntryKind {
        match &self.metadata {
            Some(m) if m.file_type().is_file() => EntryKind::File,
            Some(m) if m.file_type().is_dir() => EntryKind::Directory,
            _ => EntryKind::Other,
        }
    }

    fn size(&self) -> u64 {
        self.metadata.as_ref().map_or(0, Metadata::len)
    }

    fn children(&self) -> Result<Vec<Self>, ScanError> {
        // The root stays in the walk: a failed read_dir of it is only
        // reported through its `read_children_error`.
        let walker = WalkDir::new(&self.path)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .max_depth(1);

        let mut children = Vec::new();
        for entry in walker {
            let mut entry = entry.map_err(|err| listing_error(&self.path, err))?;
            if entry.depth == 0 {
                if let Some(err) = entry.read_children_error.take() {
                    return Err(listing_error(&self.path, err));
                }
                continue;
            }
            children.push(LocalEntry::new(entry.path()));
        }
        Ok(children)
    }

    fn absolute(&self) -> Result<Self, ScanError> {
        std::path::absolute(&self.path)
            .map(LocalEntry::new)
            .map_err(|e| ScanError::invalid_target(&self.path, e.to_string()))
    }

    fn with_path(&self, path: &Path) -> Self {
        LocalEntry::new(path)
    }
}

fn listing_error(dir: &Path, err: jwalk::Error) -> ScanError {
    let path = err.path().unwrap_or(dir).to_path_buf();
    let message = err.to_string();
    match err.into_io_error() {
        Some(source) => ScanError::io(path, source),
        None => ScanError::Other { message },
    }
}
