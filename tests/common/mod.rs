#![allow(dead_code)] // each integration binary uses a subset of these helpers

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use removal_trial_engine::prelude::*;

pub fn engine_at(dir: &Path) -> RemovalTestEngine {
    engine_with_logger(dir, Arc::new(NoopOpLogger))
}

pub fn engine_with_logger(dir: &Path, logger: Arc<dyn OperationLogger>) -> RemovalTestEngine {
    RemovalTestEngine::new(
        Box::new(store_at(dir)),
        Arc::new(StdFs),
        logger,
        DEFAULT_DISABLE_SUFFIX,
    )
}

pub fn store_at(dir: &Path) -> JsonManifestStore {
    JsonManifestStore::new(dir.join("trial.json"))
}

pub fn candidate(path: &Path, size: u64) -> RemovalCandidate {
    RemovalCandidate {
        path: path.to_path_buf(),
        size_bytes: size,
        last_modified: None,
    }
}

pub fn make_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture file");
    path
}

pub fn make_tree(dir: &Path, name: &str) -> PathBuf {
    let root = dir.join(name);
    fs::create_dir_all(root.join("nested")).expect("create fixture tree");
    fs::write(root.join("top.dat"), "top level").expect("write fixture");
    fs::write(root.join("nested/leaf.dat"), "leaf data").expect("write fixture");
    root
}
