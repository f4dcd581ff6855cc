//! End-to-end removal-trial lifecycles against a real filesystem.

mod common;

use std::fs;
use std::sync::Arc;

use removal_trial_engine::prelude::*;

use common::{candidate, engine_at, engine_with_logger, make_file, make_tree};

#[test]
fn disable_then_restore_preserves_directory_trees() {
    let dir = tempfile::tempdir().unwrap();
    let tree = make_tree(dir.path(), "old-project");

    let engine = engine_at(dir.path());
    let job = engine.disable(vec![candidate(&tree, 100)], None).unwrap();

    // Disabled: original gone, sibling present with contents intact.
    assert!(!tree.exists());
    let renamed = job.items[0].renamed_path.clone().unwrap();
    assert_eq!(
        fs::read_to_string(renamed.join("nested/leaf.dat")).unwrap(),
        "leaf data"
    );

    let job = engine.restore_all().unwrap();
    assert_eq!(job.phase, JobPhase::Selecting);
    assert!(!renamed.exists());
    assert_eq!(
        fs::read_to_string(tree.join("nested/leaf.dat")).unwrap(),
        "leaf data"
    );
}

#[test]
fn disable_with_backup_survives_permanent_delete() {
    let dir = tempfile::tempdir().unwrap();
    let tree = make_tree(dir.path(), "stale-cache");
    let vault = dir.path().join("vault");

    let engine = engine_at(dir.path());
    let job = engine
        .disable(vec![candidate(&tree, 42)], Some(vault.clone()))
        .unwrap();
    let backup = job.items[0].backup_path.clone().unwrap();

    let outcome = engine.delete_all_disabled().unwrap();
    assert_eq!(outcome.deleted_count, 1);
    assert_eq!(outcome.bytes_freed, 42);

    // The data is gone from the volume but alive in the backup subtree.
    assert!(!tree.exists());
    assert!(!job.items[0].renamed_path.clone().unwrap().exists());
    assert_eq!(
        fs::read_to_string(backup.join("nested/leaf.dat")).unwrap(),
        "leaf data"
    );
}

#[test]
fn mixed_sweep_restores_only_renamed_items() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_file(dir.path(), "a.tmp", "aaa");
    let ghost = dir.path().join("ghost.tmp");
    let b = make_file(dir.path(), "b.tmp", "bbb");

    let engine = engine_at(dir.path());
    let job = engine
        .disable(
            vec![candidate(&a, 3), candidate(&ghost, 1), candidate(&b, 3)],
            None,
        )
        .unwrap();
    assert_eq!(job.items[1].status, ItemStatus::Failed);

    let job = engine.restore_all().unwrap();
    assert_eq!(job.items[0].status, ItemStatus::Restored);
    // Failed item is left exactly as it was, not retried.
    assert_eq!(job.items[1].status, ItemStatus::Failed);
    assert_eq!(job.items[2].status, ItemStatus::Restored);
    assert!(a.exists());
    assert!(b.exists());
}

#[test]
fn single_item_operations_drive_job_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_file(dir.path(), "a.log", "a");
    let b = make_file(dir.path(), "b.log", "b");

    let engine = engine_at(dir.path());
    engine
        .disable(vec![candidate(&a, 1), candidate(&b, 1)], None)
        .unwrap();

    // Restore one, delete the other; the delete closes the trial.
    let job = engine.restore_single(&a).unwrap();
    assert_eq!(job.phase, JobPhase::Testing);
    assert!(a.exists());

    let job = engine.delete_single(&b).unwrap();
    assert_eq!(job.phase, JobPhase::Confirmed);
    assert!(!b.exists());
    assert!(engine.active_trial().unwrap().is_none());
}

#[test]
fn restore_single_refuses_reoccupied_original() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = make_file(dir.path(), "settings.ini", "old settings");

    let engine = engine_at(dir.path());
    let job = engine.disable(vec![candidate(&cfg, 12)], None).unwrap();
    let renamed = job.items[0].renamed_path.clone().unwrap();

    // The owning application regenerates the file while it is disabled.
    fs::write(&cfg, "regenerated").unwrap();

    let job = engine.restore_single(&cfg).unwrap();
    assert_eq!(job.items[0].status, ItemStatus::Failed);
    assert_eq!(
        job.items[0].error.as_deref(),
        Some("original path now exists")
    );
    assert_eq!(fs::read_to_string(&cfg).unwrap(), "regenerated");
    assert!(renamed.exists(), "disabled copy stays put");
}

#[test]
fn delete_single_rejects_already_restored_item() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_file(dir.path(), "a.log", "a");
    let b = make_file(dir.path(), "b.log", "b");

    let engine = engine_at(dir.path());
    engine
        .disable(vec![candidate(&a, 1), candidate(&b, 1)], None)
        .unwrap();
    engine.restore_single(&a).unwrap();

    let err = engine.delete_single(&a).unwrap_err();
    assert_eq!(err.code(), "RTE-2103");
    assert!(a.exists(), "restored item must not be deletable");
}

#[test]
fn every_step_lands_in_the_operations_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("ops.jsonl");
    let logger = Arc::new(JsonlOpWriter::new(log_path.clone()));

    let tree = make_tree(dir.path(), "junk");
    let vault = dir.path().join("vault");

    let engine = engine_with_logger(dir.path(), logger);
    engine
        .disable(vec![candidate(&tree, 9)], Some(vault))
        .unwrap();
    engine.delete_all_disabled().unwrap();

    let raw = fs::read_to_string(&log_path).unwrap();
    let records: Vec<OperationRecord> = raw
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let kinds: Vec<OperationKind> = records.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Backup,
            OperationKind::Disable,
            OperationKind::Delete
        ]
    );
    assert!(records.iter().all(|r| r.outcome == OpOutcome::Success));
    assert!(records.iter().all(|r| r.error.is_none()));
}

#[test]
fn failed_steps_are_logged_with_reasons() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("ops.jsonl");
    let logger = Arc::new(JsonlOpWriter::new(log_path.clone()));

    let ghost = dir.path().join("never-existed");
    let engine = engine_with_logger(dir.path(), logger);
    engine.disable(vec![candidate(&ghost, 1)], None).unwrap();

    let raw = fs::read_to_string(&log_path).unwrap();
    let record: OperationRecord = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
    assert_eq!(record.kind, OperationKind::Disable);
    assert_eq!(record.outcome, OpOutcome::Failed);
    assert_eq!(record.error.as_deref(), Some("source no longer exists"));
}

#[test]
fn broken_log_destination_never_fails_a_transition() {
    let dir = tempfile::tempdir().unwrap();
    // Parent of the log path is a file, so every append fails.
    let blocker = make_file(dir.path(), "blocker", "not a dir");
    let logger = Arc::new(JsonlOpWriter::new(blocker.join("ops.jsonl")));

    let a = make_file(dir.path(), "a.tmp", "a");
    let engine = engine_with_logger(dir.path(), logger);

    let job = engine.disable(vec![candidate(&a, 1)], None).unwrap();
    assert_eq!(job.items[0].status, ItemStatus::Renamed);

    let job = engine.restore_all().unwrap();
    assert_eq!(job.items[0].status, ItemStatus::Restored);
}

#[test]
fn space_validation_is_plumbed_through_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_file(dir.path(), "a.tmp", "abc");

    let engine = engine_at(dir.path());
    let report = engine.validate_backup_space(
        &dir.path().join("vault"),
        &[candidate(&a, 3)],
    );
    assert_eq!(report.required_bytes, 3);

    if cfg!(unix) {
        assert!(report.error.is_none());
        assert!(report.is_valid);
        // Tempdir source and tempdir vault share a volume.
        assert!(report.warning.is_some());
    }
}

#[test]
fn restore_then_new_trial_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_file(dir.path(), "a.tmp", "a");

    let engine = engine_at(dir.path());
    engine.disable(vec![candidate(&a, 1)], None).unwrap();
    engine.restore_all().unwrap();

    // Trial closed; a fresh disable must be accepted.
    let job = engine.disable(vec![candidate(&a, 1)], None).unwrap();
    assert_eq!(job.phase, JobPhase::Testing);
    assert!(!a.exists());
}
