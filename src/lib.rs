#![forbid(unsafe_code)]

//! Removal trial engine (rte): turns "items recommended for deletion" into
//! a reversible, crash-recoverable operation against a live filesystem.
//!
//! Instead of deleting straight away, a trial *disables* each item by
//! renaming it to a reserved sibling path (optionally backing it up
//! off-volume first). The user then lives with the absence for a while and
//! either restores everything or confirms the permanent delete. A durable
//! manifest, written before the first mutation and after every item
//! transition, makes the whole lifecycle recoverable after a crash.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use removal_trial_engine::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use removal_trial_engine::engine::RemovalTestEngine;
//! use removal_trial_engine::manifest::store::JsonManifestStore;
//! ```

pub mod prelude;

pub mod backup;
pub mod core;
pub mod engine;
pub mod fsops;
pub mod logger;
pub mod manifest;
