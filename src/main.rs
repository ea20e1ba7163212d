//! prewalk - count what a backup of the given targets would have to read.
//!
//! Usage:
//!   prewalk [OPTIONS] <TARGETS>...
//!   prewalk --config scan.json
//!   prewalk --exclude '*.tmp' --format json /home /etc
//!   prewalk --help

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use prewalk_core::{ScanConfig, ScanStats};
use prewalk_scan::{LocalFs, ProgressReporter, Scanner, WarningLog};

#[derive(Parser)]
#[command(
    name = "prewalk",
    version,
    about = "Count files, directories and bytes below backup targets",
    long_about = "prewalk walks the given targets the way a backup would, without \
                  reading any file contents, and reports what it found.\n\n\
                  Press Ctrl-C to stop early; the totals gathered so far are printed."
)]
struct Cli {
    /// Paths to walk
    targets: Vec<PathBuf>,

    /// Load settings from a JSON file; targets and flags given here extend it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip entries whose name matches this glob (repeatable)
    #[arg(short, long = "exclude", value_name = "GLOB")]
    excludes: Vec<String>,

    /// Skip hidden entries (names starting with '.')
    #[arg(long)]
    no_hidden: bool,

    /// Skip files larger than this (e.g., "500KB", "10MB", "1GB")
    #[arg(long, value_name = "SIZE")]
    exclude_larger_than: Option<String>,

    /// Record unreadable entries as warnings instead of aborting
    #[arg(long)]
    ignore_errors: bool,

    /// Print progress lines to stderr while walking
    #[arg(short, long)]
    progress: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Merge the config file (if any) with command-line flags.
    fn scan_config(&self) -> Result<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Cannot read {}", path.display()))?;
                serde_json::from_str::<ScanConfig>(&raw)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => ScanConfig::new(Vec::<PathBuf>::new()),
        };

        config.targets.extend(self.targets.iter().cloned());
        config.exclude_patterns.extend(self.excludes.iter().cloned());
        if self.no_hidden {
            config.include_hidden = false;
        }
        if let Some(size) = &self.exclude_larger_than {
            config.exclude_larger_than = Some(parse_size(size)?);
        }
        if self.ignore_errors {
            config.ignore_errors = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();
    let config = cli.scan_config()?;

    let warnings = WarningLog::new();
    let mut scanner = Scanner::from_config(LocalFs, &config, &warnings)?;

    let progress_task = if cli.progress {
        let reporter = ProgressReporter::new(Duration::from_millis(200));
        let mut progress_rx = reporter.subscribe();
        scanner = scanner.with_on_result(reporter.callback());

        Some(tokio::spawn(async move {
            loop {
                match progress_rx.recv().await {
                    Ok(progress) if progress.is_final() => break,
                    Ok(progress) => eprintln!(
                        "{:>10} files {:>8} dirs {:>10} {:>8.0} entries/s {:>10}/s  {}",
                        progress.stats.files,
                        progress.stats.dirs,
                        format_size(progress.stats.bytes),
                        progress.entries_per_second(),
                        format_size(progress.bytes_per_second() as u64),
                        progress.current_path.display()
                    ),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let scan_cancel = cancel.clone();
    let targets = config.targets.clone();
    let start = Instant::now();

    let mut scan =
        tokio::task::spawn_blocking(move || scanner.scan_paths(&scan_cancel, &targets));

    let result = tokio::select! {
        joined = &mut scan => joined?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, finishing the current entry");
            cancel.cancel();
            scan.await?
        }
    };

    if let Some(task) = progress_task {
        task.await?;
    }

    let stats = result.context("Scan failed")?;
    let elapsed = start.elapsed();

    match cli.format {
        OutputFormat::Text => {
            print_summary(&config, &stats, elapsed, &warnings, cancel.is_cancelled());
        }
        OutputFormat::Json => {
            let report = serde_json::json!({
                "targets": config.targets,
                "stats": stats,
                "elapsed_secs": elapsed.as_secs_f64(),
                "interrupted": cancel.is_cancelled(),
                "warnings": warnings.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default level.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("prewalk=info,prewalk_scan=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print a plain-text summary.
fn print_summary(
    config: &ScanConfig,
    stats: &ScanStats,
    elapsed: Duration,
    warnings: &WarningLog,
    interrupted: bool,
) {
    println!();
    println!("{}", "─".repeat(60));
    for target in &config.targets {
        println!(" {}", target.display());
    }
    println!("{}", "─".repeat(60));
    println!(
        " {} files, {} directories, {} other",
        stats.files, stats.dirs, stats.others
    );
    println!(" {} total", format_size(stats.bytes));
    println!(" Walked in {:.2}s", elapsed.as_secs_f64());
    if interrupted {
        println!(" Interrupted: totals are partial");
    }
    println!("{}", "─".repeat(60));

    let warnings = warnings.snapshot();
    if !warnings.is_empty() {
        println!();
        let noun = if warnings.len() == 1 { "entry" } else { "entries" };
        println!("{} {noun} skipped:", warnings.len());
        for warning in &warnings {
            println!("   {}", warning.message);
        }
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let digits = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.');
    let unit = &s[digits.len()..];

    let multiplier: u64 = match unit {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        "T" | "TB" => 1024 * 1024 * 1024 * 1024,
        other => return Err(eyre!("Unknown size unit {other:?}")),
    };
    let num: f64 = digits
        .parse()
        .with_context(|| format!("Invalid size {s:?}"))?;

    Ok((num * multiplier as f64) as u64)
}
