//! Durable removal-trial state: the job/item model and the manifest store.

pub mod model;
pub mod store;

pub use model::{ItemStatus, JobPhase, RemovalCandidate, RemovalItem, RemovalJob};
pub use store::{JsonManifestStore, ManifestStore};
