use prewalk_scan::{
    EntryKind, Filesystem, LazyMetadata, ScanConfig, ScanError, ScanStats, Scanner, WarningLog,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// What an in-memory path resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mem {
    File(u64),
    Dir,
    Other,
    StatFails,
    ListFails,
}

#[derive(Debug, Default)]
struct MemInner {
    // Insertion order doubles as readdir order.
    nodes: Vec<(PathBuf, Mem)>,
    stats: Mutex<Vec<PathBuf>>,
}

#[derive(Debug, Clone)]
struct MemFs(Arc<MemInner>);

impl MemFs {
    fn new(nodes: &[(&str, Mem)]) -> Self {
        Self(Arc::new(MemInner {
            nodes: nodes
                .iter()
                .map(|(p, m)| (PathBuf::from(p), *m))
                .collect(),
            stats: Mutex::new(Vec::new()),
        }))
    }

    fn stat_calls(&self) -> Vec<PathBuf> {
        self.0.stats.lock().unwrap().clone()
    }
}

impl Filesystem for MemFs {
    type Entry = MemEntry;

    fn entry(&self, path: &Path) -> MemEntry {
        MemEntry {
            fs: Arc::clone(&self.0),
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            node: None,
        }
    }
}

#[derive(Debug)]
struct MemEntry {
    fs: Arc<MemInner>,
    path: PathBuf,
    name: String,
    node: Option<Mem>,
}

impl LazyMetadata for MemEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn init(&mut self) -> Result<(), ScanError> {
        self.fs.stats.lock().unwrap().push(self.path.clone());
        let node = self
            .fs
            .nodes
            .iter()
            .find(|(p, _)| *p == self.path)
            .map(|(_, m)| *m);
        match node {
            None => Err(ScanError::io(&self.path, io::ErrorKind::NotFound.into())),
            Some(Mem::StatFails) => Err(ScanError::io(
                &self.path,
                io::ErrorKind::PermissionDenied.into(),
            )),
            Some(node) => {
                self.node = Some(node);
                Ok(())
            }
        }
    }

    fn kind(&self) -> EntryKind {
        match self.node {
            Some(Mem::File(_)) => EntryKind::File,
            Some(Mem::Dir) | Some(Mem::ListFails) => EntryKind::Directory,
            _ => EntryKind::Other,
        }
    }

    fn size(&self) -> u64 {
        match self.node {
            Some(Mem::File(size)) => size,
            _ => 0,
        }
    }

    fn children(&self) -> Result<Vec<Self>, ScanError> {
        if self.node == Some(Mem::ListFails) {
            return Err(ScanError::io(&self.path, io::Error::other("readdir failed")));
        }
        let fs = MemFs(Arc::clone(&self.fs));
        Ok(self
            .fs
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(self.path.as_path()))
            .map(|(p, _)| fs.entry(p))
            .collect())
    }

    fn with_path(&self, path: &Path) -> Self {
        MemFs(Arc::clone(&self.fs)).entry(path)
    }

    fn absolute(&self) -> Result<Self, ScanError> {
        if !self.path.is_absolute() {
            return Err(ScanError::invalid_target(&self.path, "relative"));
        }
        Ok(MemFs(Arc::clone(&self.fs)).entry(&self.path))
    }
}

type Results = Arc<Mutex<Vec<(PathBuf, ScanStats)>>>;

fn recording(fs: MemFs) -> (Scanner<MemFs>, Results) {
    let results: Results = Arc::default();
    let sink = Arc::clone(&results);
    let scanner = Scanner::new(fs).with_on_result(move |path, stats| {
        sink.lock().unwrap().push((path.to_path_buf(), stats));
    });
    (scanner, results)
}

fn paths(results: &Results) -> Vec<String> {
    results
        .lock()
        .unwrap()
        .iter()
        .map(|(p, _)| p.to_string_lossy().into_owned())
        .collect()
}

fn stats(files: u64, dirs: u64, others: u64, bytes: u64) -> ScanStats {
    ScanStats {
        files,
        dirs,
        others,
        bytes,
    }
}

fn mixed_tree() -> MemFs {
    MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/ok1", Mem::File(3)),
        ("/t/bad", Mem::StatFails),
        ("/t/ok2", Mem::File(4)),
    ])
}

#[test]
fn test_file_and_empty_dir_targets() {
    let fs = MemFs::new(&[("/t/a", Mem::File(10)), ("/t/b", Mem::Dir)]);
    let (mut scanner, results) = recording(fs);

    let result = scanner
        .scan_paths(&CancellationToken::new(), ["/t/a", "/t/b"])
        .unwrap();

    assert_eq!(result, stats(1, 1, 0, 10));
    let last = results.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last, (PathBuf::new(), stats(1, 1, 0, 10)));
}

#[test]
fn test_stat_error_aborts_by_default() {
    let (mut scanner, results) = recording(mixed_tree());

    let err = scanner
        .scan_paths(&CancellationToken::new(), ["/t"])
        .unwrap_err();

    match err {
        ScanError::PermissionDenied { path } => assert_eq!(path, PathBuf::from("/t/bad")),
        other => panic!("unexpected error: {other}"),
    }
    // Sorted order is bad, ok1, ok2: nothing finished before the failure.
    assert!(paths(&results).is_empty());
}

#[test]
fn test_stat_error_skipped_by_policy() {
    let (scanner, results) = recording(mixed_tree());
    let mut scanner = scanner.with_on_error(|_, _| Ok(()));

    let result = scanner
        .scan_paths(&CancellationToken::new(), ["/t"])
        .unwrap();

    assert_eq!(result, stats(2, 1, 0, 7));
    assert_eq!(paths(&results), ["/t/ok1", "/t/ok2", "/t", ""]);
}

#[test]
fn test_children_visited_in_name_order() {
    let fs = MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/B", Mem::File(1)),
        ("/t/a", Mem::File(1)),
        ("/t/c", Mem::File(1)),
    ]);
    let (mut scanner, results) = recording(fs);

    scanner
        .scan_paths(&CancellationToken::new(), ["/t"])
        .unwrap();

    assert_eq!(paths(&results), ["/t/a", "/t/B", "/t/c", "/t", ""]);
}

#[test]
fn test_targets_visited_in_name_order() {
    let fs = MemFs::new(&[("/z/x", Mem::File(1)), ("/a/y", Mem::File(2))]);
    let (mut scanner, results) = recording(fs);

    scanner
        .scan_paths(&CancellationToken::new(), ["/z/x", "/a/y"])
        .unwrap();

    assert_eq!(paths(&results), ["/a/y", "/z/x", ""]);
}

#[test]
fn test_select_by_name_prevents_stat() {
    let fs = MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/keep", Mem::File(1)),
        ("/t/skip", Mem::Dir),
        ("/t/skip/inner", Mem::File(100)),
    ]);
    let (scanner, results) = recording(fs.clone());
    let mut scanner = scanner.with_select_by_name(|name| name != "skip");

    let result = scanner
        .scan_paths(&CancellationToken::new(), ["/t"])
        .unwrap();

    assert_eq!(result, stats(1, 1, 0, 1));
    assert!(
        fs.stat_calls()
            .iter()
            .all(|p| !p.starts_with("/t/skip"))
    );
    assert!(paths(&results).iter().all(|p| !p.starts_with("/t/skip")));
}

#[test]
fn test_select_rejects_after_stat() {
    let fs = MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/big", Mem::File(1000)),
        ("/t/small", Mem::File(5)),
    ]);
    let (scanner, results) = recording(fs.clone());
    let mut scanner = scanner.with_select(|entry| entry.size() < 100);

    let result = scanner
        .scan_paths(&CancellationToken::new(), ["/t"])
        .unwrap();

    assert_eq!(result, stats(1, 1, 0, 5));
    assert!(fs.stat_calls().contains(&PathBuf::from("/t/big")));
    assert_eq!(paths(&results), ["/t/small", "/t", ""]);
}

#[test]
fn test_others_are_counted_without_recursion() {
    let fs = MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/link", Mem::Other),
        ("/t/link/ghost", Mem::File(9)),
    ]);
    let (mut scanner, _) = recording(fs.clone());

    let result = scanner
        .scan_paths(&CancellationToken::new(), ["/t"])
        .unwrap();

    assert_eq!(result, stats(0, 1, 1, 0));
    assert!(!fs.stat_calls().contains(&PathBuf::from("/t/link/ghost")));
}

#[test]
fn test_listing_error_skipped_counts_nothing() {
    let fs = MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/locked", Mem::ListFails),
        ("/t/open", Mem::File(2)),
    ]);
    let (scanner, _) = recording(fs);
    let mut scanner = scanner.with_on_error(|_, _| Ok(()));

    let result = scanner
        .scan_paths(&CancellationToken::new(), ["/t"])
        .unwrap();

    assert_eq!(result, stats(1, 1, 0, 2));
}

#[test]
fn test_on_error_result_is_returned_unchanged() {
    let fs = MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/a", Mem::File(1)),
        ("/t/b", Mem::ListFails),
        ("/t/c", Mem::File(1)),
    ]);
    let (scanner, results) = recording(fs.clone());
    let mut scanner = scanner.with_on_error(|path, _| {
        Err(ScanError::Other {
            message: format!("stop at {}", path.display()),
        })
    });

    let err = scanner
        .scan_paths(&CancellationToken::new(), ["/t"])
        .unwrap_err();

    assert_eq!(err.to_string(), "stop at /t/b");
    // Left-to-right partial progress: "a" finished, "c" was never tried.
    assert_eq!(paths(&results), ["/t/a"]);
    assert!(!fs.stat_calls().contains(&PathBuf::from("/t/c")));
}

#[test]
fn test_cancelled_before_start() {
    let fs = mixed_tree();
    let (mut scanner, results) = recording(fs.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = scanner.scan_paths(&cancel, ["/t"]).unwrap();

    assert_eq!(result, ScanStats::default());
    assert!(fs.stat_calls().is_empty());
    assert_eq!(paths(&results), [""]);
}

#[test]
fn test_cancelled_mid_scan_returns_partial_stats() {
    let fs = MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/a", Mem::File(1)),
        ("/t/b", Mem::File(1)),
        ("/t/c", Mem::File(1)),
        ("/u", Mem::File(1)),
    ]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut scanner = Scanner::new(fs.clone()).with_on_result(move |path, _| {
        if path == Path::new("/t/a") {
            trigger.cancel();
        }
    });

    let result = scanner.scan_paths(&cancel, ["/t", "/u"]).unwrap();

    assert_eq!(result.files, 1);
    assert!(!fs.stat_calls().contains(&PathBuf::from("/t/b")));
    assert!(!fs.stat_calls().contains(&PathBuf::from("/u")));
}

#[test]
fn test_results_are_deterministic_and_cumulative() {
    let fs = MemFs::new(&[
        ("/t", Mem::Dir),
        ("/t/z", Mem::Dir),
        ("/t/z/1", Mem::File(7)),
        ("/t/M", Mem::Other),
        ("/t/b", Mem::File(11)),
        ("/s", Mem::File(1)),
    ]);

    let run = || {
        let (mut scanner, results) = recording(fs.clone());
        let result = scanner
            .scan_paths(&CancellationToken::new(), ["/t", "/s"])
            .unwrap();
        let results = results.lock().unwrap().clone();
        (result, results)
    };

    let (first, first_results) = run();
    let (second, second_results) = run();
    assert_eq!(first, second);
    assert_eq!(first_results, second_results);

    let mut previous = ScanStats::default();
    let mut total = ScanStats::default();
    for (_, current) in &first_results {
        assert!(current.files >= previous.files && current.bytes >= previous.bytes);
        let delta = *current - previous;
        total = ScanStats {
            files: total.files + delta.files,
            dirs: total.dirs + delta.dirs,
            others: total.others + delta.others,
            bytes: total.bytes + delta.bytes,
        };
        previous = *current;
    }
    assert_eq!(total, first);
    assert_eq!(first, stats(3, 2, 1, 19));
}

#[test]
fn test_invalid_target_aborts_before_walk() {
    let fs = mixed_tree();
    let (mut scanner, results) = recording(fs.clone());

    let err = scanner
        .scan_paths(&CancellationToken::new(), ["relative"])
        .unwrap_err();

    assert!(matches!(err, ScanError::InvalidTarget { .. }));
    assert!(fs.stat_calls().is_empty());
    assert!(paths(&results).is_empty());
}

#[test]
fn test_nested_targets_are_walked_once() {
    let fs = MemFs::new(&[("/t", Mem::Dir), ("/t/a", Mem::File(4))]);
    let (mut scanner, _) = recording(fs);

    let result = scanner
        .scan_paths(&CancellationToken::new(), ["/t/a", "/t", "/t"])
        .unwrap();

    assert_eq!(result, stats(1, 1, 0, 4));
}

#[test]
fn test_scan_entry_directly() {
    let fs = MemFs::new(&[("/d", Mem::Dir), ("/d/f", Mem::File(8))]);
    let entry = fs.entry(Path::new("/d"));
    let mut scanner = Scanner::new(fs);

    let start = stats(5, 0, 0, 0);
    let result = scanner
        .scan_entry(&CancellationToken::new(), start, entry)
        .unwrap();

    assert_eq!(result, stats(6, 1, 0, 8));
}

#[test]
fn test_from_config_records_warnings() {
    let fs = mixed_tree();
    let config = ScanConfig::builder()
        .targets(vec![PathBuf::from("/t")])
        .ignore_errors(true)
        .exclude_patterns(vec!["ok2".to_string()])
        .build()
        .unwrap();
    let warnings = WarningLog::new();
    let mut scanner = Scanner::from_config(fs, &config, &warnings).unwrap();

    let result = scanner
        .scan_paths(&CancellationToken::new(), &config.targets)
        .unwrap();

    assert_eq!(result, stats(1, 1, 0, 3));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings.snapshot()[0].path, PathBuf::from("/t/bad"));
}
