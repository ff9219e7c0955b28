//! Pipeline command abstractions.
//!
//! A command chain is strictly linear: each command exclusively owns its
//! downstream child and forwards records to it from inside its own
//! `process` call, so the whole chain runs on one call stack with no
//! buffering between stages. A command instance is long-lived across many
//! records but is not reentrant; it must only be driven by one logical
//! session at a time.

use crate::error::Result;
use crate::record::Record;

/// Lifecycle events broadcast down a command chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// A new session is starting; stateful commands reset themselves.
    StartSession,
    /// The pipeline is shutting down; commands release held resources.
    Shutdown,
}

/// One stage in a command chain.
///
/// `process` returns `Ok(true)` when the record was handled normally
/// (whether or not any output was forwarded), and `Ok(false)` when a
/// downstream command requested cooperative early termination — a soft
/// stop, not an error. Failures are signaled by returning `Err`, never by
/// the boolean.
///
/// Implementations that own a child must forward both `process` output and
/// `notify` events to it.
pub trait Command: Send {
    /// Broadcast a lifecycle event to this command and its descendants.
    fn notify(&mut self, notification: &Notification);

    /// Process one record, forwarding derived records downstream.
    fn process(&mut self, record: Record) -> Result<bool>;
}

/// Terminal command that silently discards every record.
#[derive(Debug, Default)]
pub struct DropRecord;

impl Command for DropRecord {
    fn notify(&mut self, _notification: &Notification) {}

    fn process(&mut self, _record: Record) -> Result<bool> {
        Ok(true)
    }
}

/// Terminal command that accumulates every record it receives.
///
/// The buffer is cleared on [`Notification::StartSession`] so one collector
/// instance can observe many sessions in turn.
#[derive(Debug, Default)]
pub struct Collector {
    records: Vec<Record>,
}

impl Collector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records received since the last session start.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Drain the collected records.
    pub fn take_records(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }
}

impl Command for Collector {
    fn notify(&mut self, notification: &Notification) {
        if *notification == Notification::StartSession {
            self.records.clear();
        }
    }

    fn process(&mut self, record: Record) -> Result<bool> {
        self.records.push(record);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    #[test]
    fn test_drop_record_succeeds() {
        let mut cmd = DropRecord;
        assert!(cmd.process(Record::new()).unwrap());
    }

    #[test]
    fn test_collector_accumulates() {
        let mut collector = Collector::new();
        let mut record = Record::new();
        record.put("id", Value::Long(7));
        assert!(collector.process(record).unwrap());
        assert_eq!(collector.records().len(), 1);
        assert_eq!(
            collector.records()[0].get_first("id").and_then(Value::as_long),
            Some(7)
        );
    }

    #[test]
    fn test_collector_resets_on_session_start() {
        let mut collector = Collector::new();
        collector.process(Record::new()).unwrap();
        collector.notify(&Notification::StartSession);
        assert!(collector.records().is_empty());
    }
}
