//! Best-effort operation logging.
//!
//! The engine reports every attempted step here; nothing in this module can
//! fail an item transition. `record()` has no return value by design, and
//! every implementation swallows its own errors.

pub mod handle;
pub mod jsonl;

pub use handle::{OpLoggerHandle, spawn_op_logger};
pub use jsonl::{JsonlOpWriter, OpOutcome, OperationKind, OperationRecord};

/// Fire-and-forget sink for operation records.
pub trait OperationLogger: Send + Sync {
    /// Append one record. Must never block the caller on I/O back-pressure
    /// and must never propagate failure.
    fn record(&self, record: OperationRecord);
}

/// Discards every record; the default for tests and embedded use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOpLogger;

impl OperationLogger for NoopOpLogger {
    fn record(&self, _record: OperationRecord) {}
}
