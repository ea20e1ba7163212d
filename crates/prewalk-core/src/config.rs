//! Pre-walk configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Configuration for a pre-walk.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Paths to walk. Relative paths resolve against the working directory.
    #[serde(default)]
    pub targets: Vec<PathBuf>,

    /// Glob patterns matched against bare entry names. Matching entries are
    /// skipped before any stat.
    #[builder(default)]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Include hidden entries (names starting with `.`).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Skip regular files larger than this many bytes.
    #[builder(default)]
    #[serde(default)]
    pub exclude_larger_than: Option<u64>,

    /// Record stat and listing errors as warnings instead of aborting.
    #[builder(default = "false")]
    #[serde(default)]
    pub ignore_errors: bool,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.targets {
            Some(ref targets) => check_targets(targets),
            None => Err("At least one target is required".to_string()),
        }
    }
}

fn check_targets(targets: &[PathBuf]) -> Result<(), String> {
    if targets.is_empty() {
        return Err("At least one target is required".to_string());
    }
    if targets.iter().any(|t| t.as_os_str().is_empty()) {
        return Err("Target path cannot be empty".to_string());
    }
    Ok(())
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for walking the given targets.
    pub fn new<I, P>(targets: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            exclude_patterns: Vec::new(),
            include_hidden: true,
            exclude_larger_than: None,
            ignore_errors: false,
        }
    }

    /// Check a config that was not produced by the builder, e.g. one loaded
    /// from a file and then extended.
    pub fn validate(&self) -> Result<(), ScanError> {
        check_targets(&self.targets).map_err(|message| ScanError::InvalidConfig { message })
    }
}
