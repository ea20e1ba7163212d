//! Error types for scanning operations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during a pre-walk.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A target could not be turned into a logical tree entry.
    #[error("Invalid target {path}: {message}")]
    InvalidTarget { path: PathBuf, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a target resolution error.
    pub fn invalid_target(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The path this error is about, if it carries one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::InvalidTarget { path, .. } => Some(path),
            Self::InvalidConfig { .. } | Self::Other { .. } => None,
        }
    }

    /// Classify this error for warning reports.
    pub fn warning_kind(&self) -> WarningKind {
        match self {
            Self::PermissionDenied { .. } => WarningKind::PermissionDenied,
            Self::NotFound { .. } => WarningKind::Vanished,
            _ => WarningKind::ReadError,
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Entry disappeared between listing and stat.
    Vanished,
    /// Error reading metadata or listing a directory.
    ReadError,
}

/// An error that a policy downgraded to a skipped entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Build a warning from a skipped error.
    pub fn from_error(path: impl Into<PathBuf>, error: &ScanError) -> Self {
        Self::new(path, error.to_string(), error.warning_kind())
    }
}
