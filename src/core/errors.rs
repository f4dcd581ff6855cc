//! RTE-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, RteError>;

/// Top-level error type for the removal trial engine.
#[derive(Debug, Error)]
pub enum RteError {
    #[error("[RTE-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[RTE-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[RTE-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[RTE-1101] unsupported platform: {details}")]
    UnsupportedPlatform { details: String },

    #[error("[RTE-2001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[RTE-2002] manifest IO failure at {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[RTE-2101] a removal trial is already active: {job_id}")]
    JobActive { job_id: String },

    #[error("[RTE-2102] no removal trial is active")]
    NoActiveJob,

    #[error("[RTE-2103] item not found or not in renamed state: {path}")]
    ItemNotRenamed { path: PathBuf },

    #[error("[RTE-2104] nothing selected for removal trial")]
    EmptySelection,

    #[error("[RTE-3001] source no longer exists: {path}")]
    SourceMissing { path: PathBuf },

    #[error("[RTE-3002] target already exists: {path}")]
    TargetExists { path: PathBuf },

    #[error("[RTE-3003] permission denied for {path}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[RTE-3004] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[RTE-3101] backup copy failed for {path}: {details}")]
    BackupFailed { path: PathBuf, details: String },

    #[error(
        "[RTE-3102] insufficient space at {path}: {required} bytes required, {available} available"
    )]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    #[error("[RTE-3103] filesystem stats failure for {path}: {details}")]
    FsStats { path: PathBuf, details: String },
}

impl RteError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "RTE-1001",
            Self::MissingConfig { .. } => "RTE-1002",
            Self::ConfigParse { .. } => "RTE-1003",
            Self::UnsupportedPlatform { .. } => "RTE-1101",
            Self::Serialization { .. } => "RTE-2001",
            Self::ManifestIo { .. } => "RTE-2002",
            Self::JobActive { .. } => "RTE-2101",
            Self::NoActiveJob => "RTE-2102",
            Self::ItemNotRenamed { .. } => "RTE-2103",
            Self::EmptySelection => "RTE-2104",
            Self::SourceMissing { .. } => "RTE-3001",
            Self::TargetExists { .. } => "RTE-3002",
            Self::PermissionDenied { .. } => "RTE-3003",
            Self::Io { .. } => "RTE-3004",
            Self::BackupFailed { .. } => "RTE-3101",
            Self::InsufficientSpace { .. } => "RTE-3102",
            Self::FsStats { .. } => "RTE-3103",
        }
    }

    /// Whether this error indicates a caller bug rather than a runtime
    /// filesystem condition. Caller errors propagate; runtime failures are
    /// absorbed into per-item status during sweeps.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::JobActive { .. }
                | Self::NoActiveJob
                | Self::ItemNotRenamed { .. }
                | Self::EmptySelection
        )
    }

    /// Convenience constructor for IO errors with a known path.
    ///
    /// Permission failures get their own variant so user-facing remediation
    /// hints (run elevated, close the program holding the file) survive.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::SourceMissing { path },
            io::ErrorKind::AlreadyExists => Self::TargetExists { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }
}

impl From<serde_json::Error> for RteError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for RteError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
