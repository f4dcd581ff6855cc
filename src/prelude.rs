//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use removal_trial_engine::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, DEFAULT_DISABLE_SUFFIX};
pub use crate::core::errors::{Result, RteError};

// Filesystem seam
pub use crate::fsops::{FileOps, StdFs};

// Manifest
pub use crate::manifest::model::{
    ItemStatus, JobPhase, RemovalCandidate, RemovalItem, RemovalJob,
};
pub use crate::manifest::store::{JsonManifestStore, ManifestStore};

// Backup
pub use crate::backup::{BackupCopier, SpaceValidation};

// Logger
pub use crate::logger::{
    JsonlOpWriter, NoopOpLogger, OpLoggerHandle, OpOutcome, OperationKind, OperationLogger,
    OperationRecord, spawn_op_logger,
};

// Engine
pub use crate::engine::{DeleteSweepOutcome, RemovalTestEngine};
