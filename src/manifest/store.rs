//! Single-record manifest persistence, the crash-recovery anchor.
//!
//! The store holds at most one job. Writes are atomic (tmp file + rename)
//! so a crash mid-write leaves the previous record intact, and `clear` is
//! idempotent. The engine is the only writer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, RteError};
use crate::manifest::model::RemovalJob;

/// Durable storage for the single active removal trial.
pub trait ManifestStore: Send + Sync {
    /// Load the persisted job, if any.
    fn load(&self) -> Result<Option<RemovalJob>>;

    /// Persist the job, replacing any previous record.
    fn save(&self, job: &RemovalJob) -> Result<()>;

    /// Remove the persisted record. A missing record is not an error.
    fn clear(&self) -> Result<()>;
}

/// File-backed [`ManifestStore`] keeping one JSON document.
#[derive(Debug, Clone)]
pub struct JsonManifestStore {
    path: PathBuf,
}

impl JsonManifestStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ManifestStore for JsonManifestStore {
    fn load(&self) -> Result<Option<RemovalJob>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RteError::ManifestIo {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        let job: RemovalJob = serde_json::from_str(&raw)?;
        Ok(Some(job))
    }

    fn save(&self, job: &RemovalJob) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RteError::ManifestIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let data = serde_json::to_vec_pretty(job)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, data).map_err(|source| RteError::ManifestIo {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| RteError::ManifestIo {
            path: self.path.clone(),
            source,
        })
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RteError::ManifestIo {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
