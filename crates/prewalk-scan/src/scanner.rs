//! Sequential, cancellable pre-walk of merged targets.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use prewalk_core::{
    EntryKind, Filesystem, LazyMetadata, ScanError, ScanStats, TargetTree, sort_by_name,
};

/// Cheap filter on the bare entry name, evaluated before any stat.
pub type SelectByNameFn = Box<dyn FnMut(&str) -> bool + Send>;

/// Filter on an entry whose metadata has been read.
pub type SelectFn<M> = Box<dyn FnMut(&M) -> bool + Send>;

/// Decides what a stat or listing failure means. `Err` aborts the whole scan,
/// `Ok(())` skips the failed entry.
pub type ErrorFn = Box<dyn FnMut(&Path, ScanError) -> Result<(), ScanError> + Send>;

/// Receives the path of each finished entry with the cumulative stats.
/// The final call of a scan uses an empty path.
pub type ResultFn = Box<dyn FnMut(&Path, ScanStats) + Send>;

/// Walks targets and reports cumulative stats for every entry found.
///
/// Filtering, error handling and result reporting are pluggable through the
/// policy fields. Each policy defaults independently: both selectors accept
/// everything, `on_error` aborts with the original error, and `on_result`
/// does nothing.
pub struct Scanner<F: Filesystem> {
    fs: F,
    /// Pre-stat name filter.
    pub select_by_name: SelectByNameFn,
    /// Post-stat filter.
    pub select: SelectFn<F::Entry>,
    /// Stat and listing failure policy.
    pub on_error: ErrorFn,
    /// Progress notification.
    pub on_result: ResultFn,
}

impl<F: Filesystem> Scanner<F> {
    /// Create a scanner with default policies.
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            select_by_name: Box::new(|_: &str| true),
            select: Box::new(|_: &F::Entry| true),
            on_error: Box::new(|_: &Path, err: ScanError| Err(err)),
            on_result: Box::new(|_: &Path, _: ScanStats| {}),
        }
    }

    /// Replace the pre-stat name filter.
    pub fn with_select_by_name(mut self, f: impl FnMut(&str) -> bool + Send + 'static) -> Self {
        self.select_by_name = Box::new(f);
        self
    }

    /// Replace the post-stat filter.
    pub fn with_select(mut self, f: impl FnMut(&F::Entry) -> bool + Send + 'static) -> Self {
        self.select = Box::new(f);
        self
    }

    /// Replace the error policy.
    pub fn with_on_error(
        mut self,
        f: impl FnMut(&Path, ScanError) -> Result<(), ScanError> + Send + 'static,
    ) -> Self {
        self.on_error = Box::new(f);
        self
    }

    /// Replace the result callback.
    pub fn with_on_result(mut self, f: impl FnMut(&Path, ScanStats) + Send + 'static) -> Self {
        self.on_result = Box::new(f);
        self
    }

    /// Walk raw paths, deriving entries from the scanner's filesystem.
    pub fn scan_paths<I, P>(
        &mut self,
        cancel: &CancellationToken,
        paths: I,
    ) -> Result<ScanStats, ScanError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let targets = paths
            .into_iter()
            .map(|path| self.fs.entry(path.as_ref()))
            .collect();
        self.scan(cancel, targets)
    }

    /// Walk the targets.
    ///
    /// `on_result` is called for every entry found and once more with an
    /// empty path and the final stats, which are also returned. Cancellation
    /// is not an error: the stats gathered so far are reported and returned.
    pub fn scan(
        &mut self,
        cancel: &CancellationToken,
        targets: Vec<F::Entry>,
    ) -> Result<ScanStats, ScanError> {
        debug!(targets = targets.len(), "start scan");

        let tree = TargetTree::build(targets)?;
        debug!(leaves = tree.leaf_count(), "merged targets");

        let stats = self.scan_tree(cancel, ScanStats::new(), &tree)?;

        (self.on_result)(Path::new(""), stats);
        debug!(?stats, cancelled = cancel.is_cancelled(), "scan finished");
        Ok(stats)
    }

    fn scan_tree(
        &mut self,
        cancel: &CancellationToken,
        mut stats: ScanStats,
        tree: &TargetTree<F::Entry>,
    ) -> Result<ScanStats, ScanError> {
        if let TargetTree::Leaf(target) = tree {
            let target = target.absolute()?;
            debug!(target = %target.path().display(), "scanning target");
            return self.scan_entry(cancel, stats, target);
        }

        for name in tree.node_names() {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(child) = tree.get(name) {
                stats = self.scan_tree(cancel, stats, child)?;
            }
        }

        Ok(stats)
    }

    /// Walk one real filesystem entry and everything below it.
    ///
    /// Returns `stats` plus whatever the entry contributed. A skipped entry
    /// (filtered out, or failed with `on_error` returning `Ok`) contributes
    /// nothing and produces no `on_result` call.
    pub fn scan_entry(
        &mut self,
        cancel: &CancellationToken,
        stats: ScanStats,
        mut entry: F::Entry,
    ) -> Result<ScanStats, ScanError> {
        if cancel.is_cancelled() {
            return Ok(stats);
        }

        if !(self.select_by_name)(entry.name()) {
            trace!(path = %entry.path().display(), "excluded by name");
            return Ok(stats);
        }

        if let Err(err) = entry.init() {
            return (self.on_error)(entry.path(), err).map(|()| stats);
        }

        if !(self.select)(&entry) {
            trace!(path = %entry.path().display(), "excluded");
            return Ok(stats);
        }

        let stats = match entry.kind() {
            EntryKind::File => stats.with_file(entry.size()),
            EntryKind::Directory => {
                let mut children = match entry.children() {
                    Ok(children) => children,
                    Err(err) => return (self.on_error)(entry.path(), err).map(|()| stats),
                };
                sort_by_name(&mut children);

                let mut stats = stats;
                for child in children {
                    if cancel.is_cancelled() {
                        break;
                    }
                    stats = self.scan_entry(cancel, stats, child)?;
                }
                stats.with_dir()
            }
            EntryKind::Other => stats.with_other(),
        };

        (self.on_result)(entry.path(), stats);
        Ok(stats)
    }
}
