//! Job and item models for a removal trial.
//!
//! A trial covers a fixed set of items from creation to restore/delete.
//! Statuses form a closed set so illegal transitions are checkable, and the
//! whole structure serializes as the single manifest record.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::paths;

/// One entry from the upstream candidate list, as handed to `disable`.
///
/// Size and modification time are informational, copied verbatim; the
/// engine never re-derives them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemovalCandidate {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Recursive size reported by the scan that produced the candidate.
    pub size_bytes: u64,
    /// Last modification time reported by the scan.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Per-item lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// No filesystem action attempted yet.
    Pending,
    /// Backup copy completed; rename not yet attempted.
    BackedUp,
    /// Renamed away to the disabled sibling path.
    Renamed,
    /// Renamed back to the original path.
    Restored,
    /// Permanently removed.
    Deleted,
    /// A guarded transition failed; see the item's error message.
    Failed,
}

impl ItemStatus {
    /// Whether the engine will drive no further transition from this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Restored | Self::Deleted | Self::Failed)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::BackedUp => "backed_up",
            Self::Renamed => "renamed",
            Self::Restored => "restored",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Phase of the trial as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// No trial in flight; selection can change freely.
    Selecting,
    /// Items may be in any per-item state; the manifest is live.
    Testing,
    /// The trial ended in permanent deletion.
    Confirmed,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selecting => write!(f, "selecting"),
            Self::Testing => write!(f, "testing"),
            Self::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// One filesystem entry inside a removal trial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemovalItem {
    /// Canonical identity of the item for the trial's lifetime.
    /// Comparisons against it are case-insensitive.
    pub original_path: PathBuf,
    /// Size copied from the candidate list.
    pub size_bytes: u64,
    /// Modification time copied from the candidate list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Where the item currently lives while disabled. `Some` for every
    /// `Renamed` item; retained on `Failed` when the failure happened after
    /// a successful rename, so the data's location is never lost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_path: Option<PathBuf>,
    /// Backup location, present only after a successful backup copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// Lifecycle status.
    pub status: ItemStatus,
    /// Failure reason, present only when status is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemovalItem {
    /// Build a fresh `Pending` item from an upstream candidate.
    #[must_use]
    pub fn from_candidate(candidate: RemovalCandidate) -> Self {
        Self {
            original_path: candidate.path,
            size_bytes: candidate.size_bytes,
            last_modified: candidate.last_modified,
            renamed_path: None,
            backup_path: None,
            status: ItemStatus::Pending,
            error: None,
        }
    }

    /// The disabled sibling path this item renames to.
    #[must_use]
    pub fn disabled_path(&self, suffix: &str) -> PathBuf {
        paths::disabled_path(&self.original_path, suffix)
    }

    /// Record a failed transition.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = ItemStatus::Failed;
        self.error = Some(reason.into());
    }
}

/// A removal trial: a fixed set of items plus job-level bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemovalJob {
    /// Opaque unique identifier; scopes the backup subtree.
    pub job_id: String,
    /// Items in input order, fixed at creation.
    pub items: Vec<RemovalItem>,
    /// Phase of the trial.
    pub phase: JobPhase,
    /// Sum of item sizes at creation. Display/validation only, never
    /// recomputed from live status.
    pub total_bytes: u64,
    /// Backup root; absent means no backup step for this trial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_location: Option<PathBuf>,
    /// When the trial was created.
    pub created_at: DateTime<Utc>,
    /// When the trial left its active life.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RemovalJob {
    /// Build a new trial in `Testing` phase over the given candidates.
    #[must_use]
    pub fn new(
        job_id: String,
        candidates: Vec<RemovalCandidate>,
        backup_location: Option<PathBuf>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let items: Vec<RemovalItem> = candidates
            .into_iter()
            .map(RemovalItem::from_candidate)
            .collect();
        let total_bytes = items.iter().map(|i| i.size_bytes).sum();
        Self {
            job_id,
            items,
            phase: JobPhase::Testing,
            total_bytes,
            backup_location,
            created_at,
            completed_at: None,
        }
    }

    /// Case-insensitive lookup of an item by its original path.
    #[must_use]
    pub fn find_item(&self, original_path: &Path) -> Option<usize> {
        self.items
            .iter()
            .position(|i| paths::same_path(&i.original_path, original_path))
    }

    /// Indexes of items currently in `Renamed` status, in input order.
    #[must_use]
    pub fn renamed_indexes(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.status == ItemStatus::Renamed)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Whether any item is still disabled on disk awaiting restore/delete.
    #[must_use]
    pub fn any_renamed(&self) -> bool {
        self.items.iter().any(|i| i.status == ItemStatus::Renamed)
    }
}
