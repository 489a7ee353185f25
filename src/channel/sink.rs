//! Observable handling of dropped writes.
//!
//! Logging never fails the operation that triggered it, so `log` calls do
//! not return write errors. Instead each channel reports them here: the
//! failure is counted, forwarded to an optional callback and traced.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::error::LogError;

use super::Channel;

/// Callback invoked for every dropped write.
pub type ErrorCallback = Arc<dyn Fn(Channel, &LogError) + Send + Sync>;

/// Per-channel sink for write failures.
pub struct WriteErrorSink {
    channel: Channel,
    failures: AtomicU64,
    callback: Mutex<Option<ErrorCallback>>,
}

impl WriteErrorSink {
    /// Create a sink for the given channel with no callback.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            failures: AtomicU64::new(0),
            callback: Mutex::new(None),
        }
    }

    /// Install (or replace) the callback.
    pub fn set_callback(&self, callback: ErrorCallback) {
        let mut guard = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(callback);
    }

    /// Record a dropped write.
    pub fn report(&self, error: LogError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(channel = %self.channel, error = %error, "Dropped log write");

        let callback = self
            .callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(self.channel, &error);
        }
    }

    /// Number of writes dropped so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for WriteErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteErrorSink")
            .field("channel", &self.channel)
            .field("failures", &self.failures())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_failures() {
        let sink = WriteErrorSink::new(Channel::Access);
        assert_eq!(sink.failures(), 0);

        sink.report(LogError::Closed {
            channel: Channel::Access,
        });
        sink.report(LogError::Closed {
            channel: Channel::Access,
        });
        assert_eq!(sink.failures(), 2);
    }

    #[test]
    fn test_report_invokes_callback() {
        let sink = WriteErrorSink::new(Channel::Audit);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_cb = Arc::clone(&seen);

        sink.set_callback(Arc::new(move |channel: Channel, err: &LogError| {
            seen_in_cb
                .lock()
                .unwrap()
                .push(format!("{}: {}", channel, err));
        }));
        sink.report(LogError::Closed {
            channel: Channel::Audit,
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], "audit: Channel 'audit' is closed");
    }
}
