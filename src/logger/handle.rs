//! Channel-backed logger handle: a dedicated thread owns the writer.
//!
//! Records are sent over a bounded crossbeam channel with non-blocking
//! `try_send`, so the engine's sequential sweep is never stalled by a slow
//! or broken log destination. A full channel drops the record and bumps a
//! counter instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Sender, TrySendError, bounded};

use crate::logger::jsonl::{JsonlOpWriter, OperationRecord};
use crate::logger::OperationLogger;

enum LoggerMsg {
    Record(OperationRecord),
    Shutdown,
}

/// Thread-safe, cheaply-cloneable handle for sending operation records.
#[derive(Clone)]
pub struct OpLoggerHandle {
    tx: Sender<LoggerMsg>,
    dropped_records: Arc<AtomicU64>,
}

impl OpLoggerHandle {
    /// Number of records dropped due to channel back-pressure.
    #[must_use]
    pub fn dropped_records(&self) -> u64 {
        self.dropped_records.load(Ordering::Relaxed)
    }

    /// Request graceful shutdown; the thread drains pending records first.
    pub fn shutdown(&self) {
        let _ = self.tx.send(LoggerMsg::Shutdown);
    }
}

impl OperationLogger for OpLoggerHandle {
    fn record(&self, record: OperationRecord) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(LoggerMsg::Record(record)) {
            self.dropped_records.fetch_add(1, Ordering::Relaxed);
        }
        // Disconnected is fine during shutdown.
    }
}

/// Spawn the logger thread and return a handle plus its join handle.
#[must_use]
pub fn spawn_op_logger(
    writer: JsonlOpWriter,
    channel_capacity: usize,
) -> (OpLoggerHandle, thread::JoinHandle<()>) {
    let (tx, rx) = bounded::<LoggerMsg>(channel_capacity);
    let dropped = Arc::new(AtomicU64::new(0));

    let handle = OpLoggerHandle {
        tx,
        dropped_records: Arc::clone(&dropped),
    };

    let join = thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            match msg {
                LoggerMsg::Record(record) => writer.record(record),
                LoggerMsg::Shutdown => break,
            }
        }
    });

    (handle, join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::jsonl::{OpOutcome, OperationKind};
    use std::path::Path;

    #[test]
    fn records_flow_through_the_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.jsonl");
        let (handle, join) = spawn_op_logger(JsonlOpWriter::new(path.clone()), 16);

        for i in 0..5 {
            handle.record(OperationRecord::success(
                OperationKind::Disable,
                Path::new(&format!("/data/item-{i}")),
                None,
            ));
        }
        handle.shutdown();
        join.join().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 5);
        for line in raw.lines() {
            let record: OperationRecord = serde_json::from_str(line).unwrap();
            assert_eq!(record.outcome, OpOutcome::Success);
        }
        assert_eq!(handle.dropped_records(), 0);
    }

    #[test]
    fn send_after_shutdown_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_op_logger(JsonlOpWriter::new(dir.path().join("o.jsonl")), 4);
        handle.shutdown();
        join.join().unwrap();

        handle.record(OperationRecord::success(
            OperationKind::Delete,
            Path::new("/late"),
            None,
        ));
    }
}
