//! Ready-made scanner policies built from a [`ScanConfig`].

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

use prewalk_core::{Filesystem, LazyMetadata, ScanConfig, ScanError, ScanWarning};

use crate::scanner::Scanner;

/// Name-based exclusion: glob patterns plus the hidden-entry rule.
#[derive(Debug, Clone)]
pub struct NameFilter {
    excludes: GlobSet,
    include_hidden: bool,
}

impl NameFilter {
    /// Compile the name rules of a config.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidConfig {
                message: format!("bad exclude pattern {pattern:?}: {e}"),
            })?;
            builder.add(glob);
        }
        let excludes = builder.build().map_err(|e| ScanError::InvalidConfig {
            message: e.to_string(),
        })?;

        Ok(Self {
            excludes,
            include_hidden: config.include_hidden,
        })
    }

    /// Whether an entry with this name should be walked.
    pub fn accepts(&self, name: &str) -> bool {
        if !self.include_hidden && name.starts_with('.') {
            return false;
        }
        !self.excludes.is_match(name)
    }
}

/// Rejects regular files above a size limit. Directories always pass.
#[derive(Debug, Clone, Copy)]
pub struct SizeLimit {
    max_bytes: u64,
}

impl SizeLimit {
    /// Limit files to `max_bytes`.
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Whether an initialized entry is within the limit.
    pub fn accepts<M: LazyMetadata>(&self, entry: &M) -> bool {
        !entry.kind().is_file() || entry.size() <= self.max_bytes
    }
}

/// Shared record of errors that were downgraded to skipped entries.
#[derive(Debug, Clone, Default)]
pub struct WarningLog {
    warnings: Arc<Mutex<Vec<ScanWarning>>>,
}

impl WarningLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error and skip the entry it belongs to.
    pub fn skip(&self, path: &Path, err: ScanError) -> Result<(), ScanError> {
        warn!(path = %path.display(), error = %err, "skipping entry");
        self.lock().push(ScanWarning::from_error(path, &err));
        Ok(())
    }

    /// An `on_error` policy that records into this log.
    pub fn policy(&self) -> impl FnMut(&Path, ScanError) -> Result<(), ScanError> + Send + use<> {
        let log = self.clone();
        move |path: &Path, err: ScanError| log.skip(path, err)
    }

    /// Number of recorded warnings.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy out the recorded warnings.
    pub fn snapshot(&self) -> Vec<ScanWarning> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ScanWarning>> {
        self.warnings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F: Filesystem> Scanner<F> {
    /// Create a scanner whose policies follow `config`.
    ///
    /// Errors are recorded into `warnings` and skipped when
    /// `config.ignore_errors` is set; otherwise they abort the scan.
    pub fn from_config(fs: F, config: &ScanConfig, warnings: &WarningLog) -> Result<Self, ScanError> {
        let names = NameFilter::from_config(config)?;
        let mut scanner = Scanner::new(fs).with_select_by_name(move |name| names.accepts(name));

        if let Some(max_bytes) = config.exclude_larger_than {
            let limit = SizeLimit::new(max_bytes);
            scanner = scanner.with_select(move |entry| limit.accepts(entry));
        }

        if config.ignore_errors {
            scanner = scanner.with_on_error(warnings.policy());
        }

        Ok(scanner)
    }
}
