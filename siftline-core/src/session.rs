//! Session driver: the embedding entry point for a compiled command chain.
//!
//! For each unit of input the driver wraps it as a record, broadcasts a
//! session-start notification down the chain, invokes the head command, and
//! routes any uncaught failure to a pluggable sink together with the record
//! that was in flight. The driver never retries and never exits; what
//! happens after a failure is the embedder's decision.

use crate::command::{Command, Notification};
use crate::error::Error;
use crate::record::Record;
use tracing::{debug, warn};

/// Hook invoked with every uncaught pipeline failure.
pub trait FailureSink: Send {
    /// Handle a failure together with the record that was in flight.
    fn on_failure(&mut self, error: &Error, record: &Record);
}

/// Failure sink that reports through `tracing` and does nothing else.
#[derive(Debug, Default)]
pub struct LogFailureSink;

impl FailureSink for LogFailureSink {
    fn on_failure(&mut self, error: &Error, record: &Record) {
        warn!(%error, ?record, "record failed in pipeline");
    }
}

/// Adapter turning a closure into a failure sink.
pub struct SinkFn<F>(pub F);

impl<F> FailureSink for SinkFn<F>
where
    F: FnMut(&Error, &Record) + Send,
{
    fn on_failure(&mut self, error: &Error, record: &Record) {
        (self.0)(error, record)
    }
}

/// Drives records through the head of a compiled command chain.
pub struct SessionDriver {
    head: Box<dyn Command>,
    sink: Box<dyn FailureSink>,
}

impl SessionDriver {
    /// Create a driver over a compiled chain with a pluggable failure sink.
    pub fn new(head: Box<dyn Command>, sink: Box<dyn FailureSink>) -> Self {
        Self { head, sink }
    }

    /// Create a driver that reports failures through `tracing`.
    pub fn with_default_sink(head: Box<dyn Command>) -> Self {
        Self::new(head, Box::new(LogFailureSink))
    }

    /// Run one session: feed a record through the whole chain.
    ///
    /// Returns `true` when the chain completed normally, `false` on a soft
    /// stop or after a failure was routed to the sink.
    pub fn feed(&mut self, record: Record) -> bool {
        self.head.notify(&Notification::StartSession);
        let in_flight = record.copy();
        match self.head.process(record) {
            Ok(success) => {
                if !success {
                    debug!("chain requested early termination");
                }
                success
            }
            Err(error) => {
                self.sink.on_failure(&error, &in_flight);
                false
            }
        }
    }

    /// Broadcast shutdown down the chain.
    pub fn shutdown(&mut self) {
        self.head.notify(&Notification::Shutdown);
    }

    /// Tear down the driver and recover the chain.
    pub fn into_head(self) -> Box<dyn Command> {
        self.head
    }
}
