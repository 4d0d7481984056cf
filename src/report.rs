//! Failure reporting.
//!
//! Background refreshes absorb their failures instead of returning them.
//! An [`ErrorSink`] is where those failures surface: the repository calls
//! [`ErrorSink::report`] with a short context string naming the operation
//! that failed, and the sink decides what to do with it.

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::SyncError;

/// Receiver for failures absorbed at the repository boundary.
///
/// Implementations must not panic; a sink that fails silently is still a
/// valid sink.
pub trait ErrorSink: Send + Sync {
    /// Record one absorbed failure. `context` names the operation that
    /// produced it, for example `"fetch-all"`.
    fn report(&self, context: &str, error: &SyncError);
}

/// Sink that forwards reports to the `tracing` subscriber.
///
/// A missing employee is an answer rather than a fault, so
/// [`SyncError::NotFound`] goes out at debug level and everything else at
/// error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, context: &str, error: &SyncError) {
        if error.is_not_found() {
            debug!("{}: {}", context, error);
        } else {
            error!("{}: {}", context, error);
        }
    }
}

/// Sink that buffers reports in memory.
///
/// Backs UI surfaces that display the most recent sync failure, and test
/// code that asserts on absorbed errors.
#[derive(Debug, Default)]
pub struct CapturingSink {
    reports: Mutex<Vec<(String, String)>>,
}

impl CapturingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every report so far, oldest first, as `(context, message)` pairs.
    pub fn reports(&self) -> Vec<(String, String)> {
        self.reports.lock().clone()
    }

    /// Message of the most recent report, if any.
    pub fn last_message(&self) -> Option<String> {
        self.reports.lock().last().map(|(_, message)| message.clone())
    }

    /// Number of reports buffered.
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    /// Check whether anything has been reported.
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    /// Drop all buffered reports.
    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl ErrorSink for CapturingSink {
    fn report(&self, context: &str, error: &SyncError) {
        self.reports
            .lock()
            .push((context.to_string(), error.to_string()));
    }
}
