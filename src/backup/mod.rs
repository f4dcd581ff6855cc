//! Backup collaborator: off-volume copies and the pre-flight space check.
//!
//! Backups land in `<root>/<job_id>/<drive-relative source>` so one job's
//! copies never collide with another's, and a restore operator can read the
//! original location straight out of the tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::{Result, RteError};
use crate::core::paths;
use crate::fsops::FileOps;

/// Report produced by [`BackupCopier::validate_space`].
#[derive(Debug, Clone, Serialize)]
pub struct SpaceValidation {
    /// Whether the destination can hold the required bytes.
    pub is_valid: bool,
    /// Bytes available at the destination volume (0 when unknown).
    pub available_bytes: u64,
    /// Bytes the backup would need.
    pub required_bytes: u64,
    /// Advisory, e.g. a source sharing the destination volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Hard failure reason (unwritable destination, stats failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Copies candidate trees into a job-scoped backup subtree.
#[derive(Clone)]
pub struct BackupCopier {
    fs: Arc<dyn FileOps>,
}

impl BackupCopier {
    #[must_use]
    pub fn new(fs: Arc<dyn FileOps>) -> Self {
        Self { fs }
    }

    /// Destination a source would be copied to for a given job.
    #[must_use]
    pub fn destination_for(backup_root: &Path, job_id: &str, source: &Path) -> PathBuf {
        backup_root.join(job_id).join(paths::drive_relative(source))
    }

    /// Copy `source` (file or tree) into the job's backup subtree.
    ///
    /// Fail-closed: an already-occupied destination is an error, never an
    /// overwrite. Returns the backup location on success.
    pub fn copy(&self, source: &Path, backup_root: &Path, job_id: &str) -> Result<PathBuf> {
        let dest = Self::destination_for(backup_root, job_id, source);
        self.fs
            .copy_recursive(source, &dest)
            .map_err(|e| RteError::BackupFailed {
                path: source.to_path_buf(),
                details: e.to_string(),
            })?;
        Ok(dest)
    }

    /// Pre-flight space check for a planned backup.
    ///
    /// Never returns an error: failures are folded into the report so the
    /// caller can render them alongside the numbers. A warning (source and
    /// destination on one volume) does not invalidate the plan; it flags
    /// that the backup would not survive that volume dying.
    #[must_use]
    pub fn validate_space(
        &self,
        backup_root: &Path,
        required_bytes: u64,
        source_paths: &[PathBuf],
    ) -> SpaceValidation {
        let probe = nearest_existing(backup_root);
        let available_bytes = match self.fs.available_bytes(&probe) {
            Ok(avail) => avail,
            Err(e) => {
                return SpaceValidation {
                    is_valid: false,
                    available_bytes: 0,
                    required_bytes,
                    warning: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let warning = self.same_volume_warning(&probe, source_paths);

        SpaceValidation {
            is_valid: available_bytes >= required_bytes,
            available_bytes,
            required_bytes,
            warning,
            error: None,
        }
    }

    fn same_volume_warning(&self, probe: &Path, source_paths: &[PathBuf]) -> Option<String> {
        let dest_dev = self.fs.device_id(probe).ok()?;
        for source in source_paths {
            if let Ok(dev) = self.fs.device_id(source)
                && dev == dest_dev
            {
                return Some(format!(
                    "{} shares a volume with the backup destination; the backup will not protect against volume failure",
                    source.display()
                ));
            }
        }
        None
    }
}

/// Walk up to the nearest existing ancestor so stats queries work for a
/// backup root that has not been created yet.
fn nearest_existing(path: &Path) -> PathBuf {
    let mut current = path;
    while !current.exists() {
        match current.parent() {
            Some(parent) if parent != current => current = parent,
            _ => break,
        }
    }
    current.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsops::StdFs;
    use std::fs;

    fn copier() -> BackupCopier {
        BackupCopier::new(Arc::new(StdFs))
    }

    #[test]
    fn destination_mirrors_drive_relative_path() {
        let dest = BackupCopier::destination_for(
            Path::new("/backup"),
            "rte-0000000000000001",
            Path::new("/data/projects/junk"),
        );
        assert_eq!(
            dest,
            Path::new("/backup/rte-0000000000000001/data/projects/junk")
        );
    }

    #[test]
    fn copy_places_tree_under_job_scope() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stale-cache");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("sub/blob.bin"), [7u8; 64]).unwrap();

        let root = dir.path().join("vault");
        let dest = copier().copy(&source, &root, "rte-00000000000000aa").unwrap();

        assert!(dest.starts_with(root.join("rte-00000000000000aa")));
        assert!(dest.join("sub/blob.bin").exists());
        // Source untouched by the copy step.
        assert!(source.join("sub/blob.bin").exists());
    }

    #[test]
    fn copy_missing_source_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let err = copier()
            .copy(
                &dir.path().join("ghost"),
                &dir.path().join("vault"),
                "rte-00000000000000ab",
            )
            .unwrap_err();
        assert_eq!(err.code(), "RTE-3101");
    }

    #[test]
    fn copy_never_overwrites_existing_backup() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("item.txt");
        fs::write(&source, "fresh").unwrap();

        let root = dir.path().join("vault");
        let job = "rte-00000000000000ac";
        let dest = BackupCopier::destination_for(&root, job, &source);
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "previous run").unwrap();

        let err = copier().copy(&source, &root, job).unwrap_err();
        assert_eq!(err.code(), "RTE-3101");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous run");
    }

    #[cfg(unix)]
    #[test]
    fn validate_space_reports_available_and_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let report = copier().validate_space(&dir.path().join("vault"), 1, &[]);
        assert!(report.error.is_none());
        assert!(report.available_bytes > 0);
        assert!(report.is_valid);
        assert_eq!(report.required_bytes, 1);
    }

    #[cfg(unix)]
    #[test]
    fn validate_space_flags_impossible_requirement() {
        let dir = tempfile::tempdir().unwrap();
        let report = copier().validate_space(dir.path(), u64::MAX, &[]);
        assert!(!report.is_valid);
        assert!(report.error.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn validate_space_warns_on_shared_volume() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("candidate");
        fs::write(&source, "x").unwrap();

        // Destination under the same tempdir: same device as the source.
        let report = copier().validate_space(&dir.path().join("vault"), 1, &[source]);
        assert!(report.warning.is_some());
        assert!(report.is_valid, "warning must not invalidate the plan");
    }
}
