//! Error types for the Lumo log subsystem.

use std::fmt;

use thiserror::Error;

use crate::channel::Channel;

/// Main error type for log channels and the audit store.
#[derive(Error, Debug)]
pub enum LogError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A write was attempted on a channel whose file is closed.
    #[error("Channel '{channel}' is closed")]
    Closed { channel: Channel },

    /// A channel mutex was poisoned by a panicking writer.
    #[error("Lock poisoned for channel '{channel}'")]
    LockPoisoned { channel: Channel },

    /// One or more channels failed during an aggregate operation.
    #[error("{0}")]
    Channels(ChannelErrors),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors collected from every channel that failed during a manager-wide
/// operation such as `close` or `rotate_all`.
#[derive(Debug, Default)]
pub struct ChannelErrors {
    errors: Vec<(Channel, LogError)>,
}

impl ChannelErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one channel operation, keeping only failures.
    pub fn record(&mut self, channel: Channel, result: LogResult<()>) {
        if let Err(e) = result {
            self.errors.push((channel, e));
        }
    }

    /// Whether no channel failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failed channels.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the failures.
    pub fn iter(&self) -> impl Iterator<Item = &(Channel, LogError)> {
        self.errors.iter()
    }

    /// The channels that failed, in the order they were recorded.
    pub fn channels(&self) -> Vec<Channel> {
        self.errors.iter().map(|(c, _)| *c).collect()
    }

    /// Convert into `Ok(())` when empty, otherwise `Err(LogError::Channels)`.
    pub fn into_result(self) -> LogResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(LogError::Channels(self))
        }
    }
}

impl fmt::Display for ChannelErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} channel(s) failed: ", self.errors.len())?;
        for (i, (channel, err)) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", channel, err)?;
        }
        Ok(())
    }
}

/// Result type alias for log operations.
pub type LogResult<T> = Result<T, LogError>;
