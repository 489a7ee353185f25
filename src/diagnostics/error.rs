//! Error logger.

use std::backtrace::Backtrace;
use std::panic::Location;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::channel::{Channel, ChannelFile, ErrorCallback, WriteErrorSink};
use crate::error::{LogError, LogResult};

use super::entry::ErrorEntry;
use super::level::{Level, LineFormat};

struct ErrorState {
    file: ChannelFile,
    min_level: Level,
    format: LineFormat,
}

/// Logger for error reports with optional cause, location and stack.
pub struct ErrorLogger {
    state: Mutex<ErrorState>,
    errors: WriteErrorSink,
}

impl ErrorLogger {
    pub fn new(path: &Path, min_level: Level, format: LineFormat) -> LogResult<Self> {
        let file = ChannelFile::open(Channel::Error, path)?;
        Ok(Self {
            state: Mutex::new(ErrorState {
                file,
                min_level,
                format,
            }),
            errors: WriteErrorSink::new(Channel::Error),
        })
    }

    pub fn set_level(&self, level: Level) {
        if let Ok(mut state) = self.lock() {
            state.min_level = level;
        }
    }

    pub fn set_format(&self, format: LineFormat) {
        if let Ok(mut state) = self.lock() {
            state.format = format;
        }
    }

    /// Write an entry, defaulting level to `ERROR` and time to now.
    pub fn log(&self, mut entry: ErrorEntry) {
        entry.normalize();
        if let Err(e) = self.try_log(&entry) {
            self.errors.report(e);
        }
    }

    fn try_log(&self, entry: &ErrorEntry) -> LogResult<()> {
        let mut state = self.lock()?;
        if entry.level.unwrap_or(Level::Error) < state.min_level {
            return Ok(());
        }
        let line = match state.format {
            LineFormat::Json => serde_json::to_string(entry)?,
            LineFormat::Text => entry.to_text(),
        };
        state.file.append_line(&line)
    }

    /// Log a message with an underlying error.
    pub fn log_error(&self, message: &str, err: &dyn std::error::Error) {
        self.log(ErrorEntry::new(message).with_error(err));
    }

    /// Log a message with an explicit source location.
    pub fn log_with_location(
        &self,
        message: &str,
        err: Option<&dyn std::error::Error>,
        file: &str,
        line: u32,
    ) {
        let mut entry = ErrorEntry::new(message).with_location(file, line);
        if let Some(err) = err {
            entry = entry.with_error(err);
        }
        self.log(entry);
    }

    /// Log a message tagged with the caller's source location.
    #[track_caller]
    pub fn log_here(&self, message: &str, err: Option<&dyn std::error::Error>) {
        let caller = Location::caller();
        self.log_with_location(message, err, caller.file(), caller.line());
    }

    /// Log a message together with a captured stack trace.
    #[track_caller]
    pub fn log_with_stack(&self, message: &str, err: Option<&dyn std::error::Error>) {
        let caller = Location::caller();
        let mut entry = ErrorEntry::new(message)
            .with_location(caller.file(), caller.line())
            .with_stack(Backtrace::force_capture().to_string());
        if let Some(err) = err {
            entry = entry.with_error(err);
        }
        self.log(entry);
    }

    pub fn rotate(&self) -> LogResult<()> {
        self.lock()?.file.rotate().map(|_| ())
    }

    pub fn close(&self) -> LogResult<()> {
        self.lock()?.file.close()
    }

    pub fn write_failures(&self) -> u64 {
        self.errors.failures()
    }

    pub fn on_write_error(&self, callback: ErrorCallback) {
        self.errors.set_callback(callback);
    }

    fn lock(&self) -> LogResult<MutexGuard<'_, ErrorState>> {
        self.state.lock().map_err(|_| LogError::LockPoisoned {
            channel: Channel::Error,
        })
    }
}
