use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use thiserror::Error;

/// Error raised by a session driver, carrying the client/server error text.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        DriverError(message.into())
    }
}

/// Failure kinds of the pool and executor.
///
/// None of these cross the public query surface; they feed the [`ErrorSink`]
/// and the error counters, and callers observe a `false`/empty result.
#[derive(Debug, Error)]
pub enum MysqlMiddlewareError {
    #[error("Connection initialization failed: {0}")]
    ConnectionInit(String),

    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Parameter wasn't escaped: {0}")]
    ParameterEscape(String),

    #[error("SQL Error: {0}")]
    Execution(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// The most recent failure, tagged with the thread that caused it.
#[derive(Debug, Clone)]
pub struct LastError {
    /// Id of the thread whose operation failed
    pub thread_id: ThreadId,
    /// Human-readable failure text, including the server error where available
    pub message: String,
}

/// Single shared slot holding the most recent failure.
///
/// Concurrent errors race for the slot and the last writer wins; reading the
/// slot clears it. This is a deliberately coarse diagnostics channel, not a
/// per-call error path.
#[derive(Debug, Default)]
pub struct ErrorSink {
    slot: Mutex<Option<LastError>>,
}

impl ErrorSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `(current thread id, message)`, overwriting any unread entry.
    pub fn report(&self, message: impl Into<String>) {
        let entry = LastError {
            thread_id: thread::current().id(),
            message: message.into(),
        };
        *self.slot.lock() = Some(entry);
    }

    /// Return the pending entry and clear it, or `None` if nothing is pending.
    #[must_use]
    pub fn take(&self) -> Option<LastError> {
        self.slot.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_returns_entry_exactly_once() {
        let sink = ErrorSink::new();
        sink.report("boom");
        let first = sink.take().expect("entry pending");
        assert_eq!(first.message, "boom");
        assert_eq!(first.thread_id, thread::current().id());
        assert!(sink.take().is_none());
    }

    #[test]
    fn later_report_overwrites_unread_entry() {
        let sink = ErrorSink::new();
        sink.report("first");
        sink.report("second");
        assert_eq!(sink.take().unwrap().message, "second");
        assert!(sink.take().is_none());
    }

    #[test]
    fn entry_carries_reporting_thread_id() {
        let sink = std::sync::Arc::new(ErrorSink::new());
        let clone = std::sync::Arc::clone(&sink);
        let reporter = thread::spawn(move || {
            clone.report("from worker");
            thread::current().id()
        });
        let reporter_id = reporter.join().unwrap();
        let entry = sink.take().unwrap();
        assert_eq!(entry.thread_id, reporter_id);
        assert_ne!(entry.thread_id, thread::current().id());
    }
}
