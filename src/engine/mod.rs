//! Removal trial orchestration.
//!
//! Lifecycle per trial: disable (rename-away, optional backup first) ->
//! restore (rename-back) or permanent delete, with single-item variants and
//! an active-trial recovery read.
//!
//! Safety contract, enforced in this order everywhere:
//! 1. The manifest is durably written before the first filesystem mutation
//!    of a trial, and re-written after every single item transition.
//! 2. A backup outcome is persisted before the rename for that item runs.
//! 3. No rename or restore ever lands on an occupied path.
//! 4. One item's failure never blocks or rolls back another item.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::backup::{BackupCopier, SpaceValidation};
use crate::core::errors::{Result, RteError};
use crate::fsops::FileOps;
use crate::logger::{OperationKind, OperationLogger, OperationRecord};
use crate::manifest::model::{ItemStatus, JobPhase, RemovalCandidate, RemovalItem, RemovalJob};
use crate::manifest::store::ManifestStore;

// Per-item failure reasons. These are user-facing and stable; tests and the
// recovery read rely on the exact wording.
const SOURCE_GONE: &str = "source no longer exists";
const TARGET_OCCUPIED: &str = "rename target already exists";
const RENAMED_GONE: &str = "renamed file no longer exists";
const ORIGINAL_OCCUPIED: &str = "original path now exists";

/// Aggregate result of a permanent-delete sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteSweepOutcome {
    /// Items successfully removed.
    pub deleted_count: usize,
    /// Sum of the removed items' recorded sizes (not a live re-measure).
    pub bytes_freed: u64,
    /// Items that could not be removed, with their failure reasons.
    pub failed_items: Vec<RemovalItem>,
}

/// The removal trial engine: sole writer of the manifest store and sole
/// caller of the filesystem primitives for this subsystem.
pub struct RemovalTestEngine {
    store: Box<dyn ManifestStore>,
    fs: Arc<dyn FileOps>,
    backup: BackupCopier,
    logger: Arc<dyn OperationLogger>,
    disable_suffix: String,
}

impl RemovalTestEngine {
    /// Build an engine over the injected collaborators.
    #[must_use]
    pub fn new(
        store: Box<dyn ManifestStore>,
        fs: Arc<dyn FileOps>,
        logger: Arc<dyn OperationLogger>,
        disable_suffix: impl Into<String>,
    ) -> Self {
        let backup = BackupCopier::new(Arc::clone(&fs));
        Self {
            store,
            fs,
            backup,
            logger,
            disable_suffix: disable_suffix.into(),
        }
    }

    // ──────────────────── trial operations ────────────────────

    /// Start a removal trial: rename every candidate away, backing each up
    /// first when a backup location is given.
    ///
    /// The job is persisted before the first filesystem mutation. Items are
    /// processed strictly in input order, the manifest re-persisted after
    /// each one, so a crash at any point leaves an accurate record. Items
    /// that fail stay failed; the sweep continues.
    pub fn disable(
        &self,
        candidates: Vec<RemovalCandidate>,
        backup_location: Option<PathBuf>,
    ) -> Result<RemovalJob> {
        if candidates.is_empty() {
            return Err(RteError::EmptySelection);
        }
        if let Some(existing) = self.store.load()?
            && existing.phase == JobPhase::Testing
        {
            return Err(RteError::JobActive {
                job_id: existing.job_id,
            });
        }

        let mut job = RemovalJob::new(new_job_id(), candidates, backup_location, Utc::now());
        self.store.save(&job)?;

        for idx in 0..job.items.len() {
            self.disable_item(&mut job, idx)?;
        }
        Ok(job)
    }

    /// Rename every disabled item back to its original path, close the
    /// trial, and clear the manifest.
    ///
    /// Items not currently `Renamed` are left untouched.
    pub fn restore_all(&self) -> Result<RemovalJob> {
        let mut job = self.active_job()?;
        for idx in job.renamed_indexes() {
            self.restore_item(&mut job, idx)?;
        }

        job.phase = JobPhase::Selecting;
        job.completed_at = Some(Utc::now());
        self.store.save(&job)?;
        if !job.any_renamed() {
            self.store.clear()?;
        }
        Ok(job)
    }

    /// Permanently delete every disabled item and clear the manifest.
    ///
    /// Terminal for the job: returns an aggregate rather than a snapshot.
    /// Freed bytes are the items' recorded sizes.
    pub fn delete_all_disabled(&self) -> Result<DeleteSweepOutcome> {
        let mut job = self.active_job()?;
        let mut outcome = DeleteSweepOutcome::default();

        for idx in job.renamed_indexes() {
            self.delete_item(&mut job, idx)?;
            if job.items[idx].status == ItemStatus::Deleted {
                outcome.deleted_count += 1;
                outcome.bytes_freed += job.items[idx].size_bytes;
            } else {
                outcome.failed_items.push(job.items[idx].clone());
            }
        }

        job.phase = JobPhase::Confirmed;
        job.completed_at = Some(Utc::now());
        self.store.save(&job)?;
        if !job.any_renamed() {
            self.store.clear()?;
        }
        Ok(outcome)
    }

    /// Restore one item, located by case-insensitive original path.
    ///
    /// Errors with [`RteError::ItemNotRenamed`] when the path does not
    /// match a `Renamed` item; that is a caller bug, not a trial failure.
    /// When nothing remains disabled afterwards the trial closes out.
    pub fn restore_single(&self, original_path: &Path) -> Result<RemovalJob> {
        let mut job = self.active_job()?;
        let idx = self.renamed_item_index(&job, original_path)?;
        self.restore_item(&mut job, idx)?;
        self.close_if_settled(&mut job, JobPhase::Selecting)?;
        Ok(job)
    }

    /// Permanently delete one item, located by case-insensitive original
    /// path. Same lookup contract as [`Self::restore_single`]; when nothing
    /// remains disabled afterwards the trial closes as `Confirmed`.
    pub fn delete_single(&self, original_path: &Path) -> Result<RemovalJob> {
        let mut job = self.active_job()?;
        let idx = self.renamed_item_index(&job, original_path)?;
        self.delete_item(&mut job, idx)?;
        self.close_if_settled(&mut job, JobPhase::Confirmed)?;
        Ok(job)
    }

    /// Recovery read: the persisted trial, if one is active.
    ///
    /// Every item believed `Renamed` is re-validated against the disk; a
    /// vanished renamed path reclassifies the item to `Failed` and the
    /// healed manifest is persisted. Safe to call repeatedly.
    pub fn active_trial(&self) -> Result<Option<RemovalJob>> {
        let Some(mut job) = self.store.load()? else {
            return Ok(None);
        };
        if job.phase != JobPhase::Testing {
            return Ok(None);
        }

        let mut healed = false;
        for item in &mut job.items {
            if item.status == ItemStatus::Renamed
                && let Some(renamed) = item.renamed_path.clone()
                && !self.fs.exists(&renamed)
            {
                item.fail(RENAMED_GONE);
                healed = true;
            }
        }
        if healed {
            self.store.save(&job)?;
        }
        Ok(Some(job))
    }

    /// Pre-flight space check for a backup-enabled trial over `candidates`.
    #[must_use]
    pub fn validate_backup_space(
        &self,
        backup_root: &Path,
        candidates: &[RemovalCandidate],
    ) -> SpaceValidation {
        let required: u64 = candidates.iter().map(|c| c.size_bytes).sum();
        let sources: Vec<PathBuf> = candidates.iter().map(|c| c.path.clone()).collect();
        self.backup.validate_space(backup_root, required, &sources)
    }

    // ──────────────────── per-item transitions ────────────────────

    fn disable_item(&self, job: &mut RemovalJob, idx: usize) -> Result<()> {
        if let Some(root) = job.backup_location.clone() {
            self.backup_item(job, idx, &root)?;
            // Fail-closed: a requested backup that did not succeed means
            // the rename must not run for this item.
            if job.items[idx].status != ItemStatus::BackedUp {
                return Ok(());
            }
        }

        let source = job.items[idx].original_path.clone();
        let target = job.items[idx].disabled_path(&self.disable_suffix);

        if !self.fs.exists(&source) {
            job.items[idx].fail(SOURCE_GONE);
        } else if self.fs.exists(&target) {
            job.items[idx].fail(TARGET_OCCUPIED);
        } else {
            match self.fs.rename(&source, &target) {
                Ok(()) => {
                    job.items[idx].status = ItemStatus::Renamed;
                    job.items[idx].renamed_path = Some(target.clone());
                }
                Err(e) => job.items[idx].fail(e.to_string()),
            }
        }
        self.store.save(job)?;
        self.log_step(OperationKind::Disable, &source, Some(&target), &job.items[idx]);
        Ok(())
    }

    fn backup_item(&self, job: &mut RemovalJob, idx: usize, root: &Path) -> Result<()> {
        let source = job.items[idx].original_path.clone();

        if !self.fs.exists(&source) {
            job.items[idx].fail(SOURCE_GONE);
            self.store.save(job)?;
            self.log_step(OperationKind::Backup, &source, None, &job.items[idx]);
            return Ok(());
        }

        match self.backup.copy(&source, root, &job.job_id) {
            Ok(dest) => {
                job.items[idx].backup_path = Some(dest.clone());
                job.items[idx].status = ItemStatus::BackedUp;
                // The copy outcome must hit durable storage before the
                // rename for this item is attempted.
                self.store.save(job)?;
                self.log_step(OperationKind::Backup, &source, Some(&dest), &job.items[idx]);
            }
            Err(e) => {
                job.items[idx].fail(e.to_string());
                self.store.save(job)?;
                self.log_step(OperationKind::Backup, &source, None, &job.items[idx]);
            }
        }
        Ok(())
    }

    fn restore_item(&self, job: &mut RemovalJob, idx: usize) -> Result<()> {
        let original = job.items[idx].original_path.clone();
        let Some(renamed) = job.items[idx].renamed_path.clone() else {
            job.items[idx].fail(RENAMED_GONE);
            self.store.save(job)?;
            return Ok(());
        };

        if !self.fs.exists(&renamed) {
            job.items[idx].fail(RENAMED_GONE);
        } else if self.fs.exists(&original) {
            // Something recreated the original (an application regenerating
            // its folder, say). Never rename over it.
            job.items[idx].fail(ORIGINAL_OCCUPIED);
        } else {
            match self.fs.rename(&renamed, &original) {
                Ok(()) => {
                    job.items[idx].status = ItemStatus::Restored;
                    job.items[idx].renamed_path = None;
                    job.items[idx].error = None;
                }
                Err(e) => job.items[idx].fail(e.to_string()),
            }
        }
        self.store.save(job)?;
        self.log_step(OperationKind::Restore, &renamed, Some(&original), &job.items[idx]);
        Ok(())
    }

    fn delete_item(&self, job: &mut RemovalJob, idx: usize) -> Result<()> {
        let Some(renamed) = job.items[idx].renamed_path.clone() else {
            job.items[idx].fail(RENAMED_GONE);
            self.store.save(job)?;
            return Ok(());
        };

        if !self.fs.exists(&renamed) {
            job.items[idx].fail(RENAMED_GONE);
        } else {
            match self.fs.remove_recursive(&renamed) {
                Ok(()) => {
                    job.items[idx].status = ItemStatus::Deleted;
                    job.items[idx].renamed_path = None;
                    job.items[idx].error = None;
                }
                Err(e) => job.items[idx].fail(e.to_string()),
            }
        }
        self.store.save(job)?;
        self.log_step(OperationKind::Delete, &renamed, None, &job.items[idx]);
        Ok(())
    }

    // ──────────────────── shared plumbing ────────────────────

    fn active_job(&self) -> Result<RemovalJob> {
        match self.store.load()? {
            Some(job) if job.phase == JobPhase::Testing => Ok(job),
            _ => Err(RteError::NoActiveJob),
        }
    }

    fn renamed_item_index(&self, job: &RemovalJob, original_path: &Path) -> Result<usize> {
        job.find_item(original_path)
            .filter(|&idx| job.items[idx].status == ItemStatus::Renamed)
            .ok_or_else(|| RteError::ItemNotRenamed {
                path: original_path.to_path_buf(),
            })
    }

    fn close_if_settled(&self, job: &mut RemovalJob, phase: JobPhase) -> Result<()> {
        if job.any_renamed() {
            return Ok(());
        }
        job.phase = phase;
        job.completed_at = Some(Utc::now());
        self.store.save(job)?;
        self.store.clear()
    }

    fn log_step(
        &self,
        kind: OperationKind,
        source: &Path,
        destination: Option<&Path>,
        item: &RemovalItem,
    ) {
        let record = if item.status == ItemStatus::Failed {
            OperationRecord::failed(
                kind,
                source,
                destination,
                item.error.as_deref().unwrap_or("unknown failure"),
            )
        } else {
            OperationRecord::success(kind, source, destination)
        };
        self.logger.record(record);
    }
}

fn new_job_id() -> String {
    format!("rte-{:016x}", rand::random::<u64>())
}
