//! Server logger with a severity floor and optional console mirror.

use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::channel::{Channel, ChannelFile, ErrorCallback, Fields, WriteErrorSink};
use crate::error::{LogError, LogResult};

use super::entry::ServerEntry;
use super::level::{Level, LineFormat};

struct ServerState {
    file: ChannelFile,
    min_level: Level,
    format: LineFormat,
    console: bool,
}

/// Logger for general server diagnostics.
///
/// Calls below the configured floor return before any formatting or I/O.
pub struct ServerLogger {
    state: Mutex<ServerState>,
    errors: WriteErrorSink,
}

impl ServerLogger {
    /// Create a server logger writing to `path`.
    pub fn new(
        path: &Path,
        min_level: Level,
        format: LineFormat,
        console: bool,
    ) -> LogResult<Self> {
        let file = ChannelFile::open(Channel::Server, path)?;
        Ok(Self {
            state: Mutex::new(ServerState {
                file,
                min_level,
                format,
                console,
            }),
            errors: WriteErrorSink::new(Channel::Server),
        })
    }

    /// Set the minimum level that will be written.
    pub fn set_level(&self, level: Level) {
        if let Ok(mut state) = self.lock() {
            state.min_level = level;
        }
    }

    /// The current minimum level.
    pub fn level(&self) -> Level {
        self.lock().map(|s| s.min_level).unwrap_or_default()
    }

    /// Toggle mirroring to stdout.
    pub fn set_console(&self, console: bool) {
        if let Ok(mut state) = self.lock() {
            state.console = console;
        }
    }

    pub fn set_format(&self, format: LineFormat) {
        if let Ok(mut state) = self.lock() {
            state.format = format;
        }
    }

    /// Whether an entry at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        self.lock().map(|s| level >= s.min_level).unwrap_or(false)
    }

    /// Write a fully built entry, subject to the level floor.
    pub fn log(&self, entry: &ServerEntry) {
        if let Err(e) = self.try_log(entry) {
            self.errors.report(e);
        }
    }

    fn try_log(&self, entry: &ServerEntry) -> LogResult<()> {
        let mut state = self.lock()?;
        if entry.level < state.min_level {
            return Ok(());
        }

        let line = match state.format {
            LineFormat::Json => serde_json::to_string(entry)?,
            LineFormat::Text => entry.to_text(),
        };

        if state.console {
            let text = match state.format {
                LineFormat::Json => entry.to_text(),
                LineFormat::Text => line.clone(),
            };
            let _ = writeln!(std::io::stdout().lock(), "{}", text);
        }

        state.file.append_line(&line)
    }

    /// Log a message with structured fields.
    pub fn log_with(&self, level: Level, message: &str, fields: Fields) {
        if !self.enabled(level) {
            return;
        }
        self.log(&ServerEntry::new(level, message).with_fields(fields));
    }

    pub fn debug(&self, message: &str) {
        self.log_with(Level::Debug, message, Fields::new());
    }

    pub fn info(&self, message: &str) {
        self.log_with(Level::Info, message, Fields::new());
    }

    pub fn warn(&self, message: &str) {
        self.log_with(Level::Warn, message, Fields::new());
    }

    pub fn error(&self, message: &str) {
        self.log_with(Level::Error, message, Fields::new());
    }

    pub fn debug_with(&self, message: &str, fields: Fields) {
        self.log_with(Level::Debug, message, fields);
    }

    pub fn info_with(&self, message: &str, fields: Fields) {
        self.log_with(Level::Info, message, fields);
    }

    pub fn warn_with(&self, message: &str, fields: Fields) {
        self.log_with(Level::Warn, message, fields);
    }

    pub fn error_with(&self, message: &str, fields: Fields) {
        self.log_with(Level::Error, message, fields);
    }

    /// Write a fatal entry, close the file and terminate the process.
    pub fn fatal(&self, message: &str, fields: Fields) -> ! {
        self.log(&ServerEntry::new(Level::Fatal, message).with_fields(fields));
        let _ = self.close();
        std::process::exit(1);
    }

    /// Rotate the server log file.
    pub fn rotate(&self) -> LogResult<()> {
        self.lock()?.file.rotate().map(|_| ())
    }

    /// Close the server log file.
    pub fn close(&self) -> LogResult<()> {
        self.lock()?.file.close()
    }

    /// Number of entries dropped because of write failures.
    pub fn write_failures(&self) -> u64 {
        self.errors.failures()
    }

    pub fn on_write_error(&self, callback: ErrorCallback) {
        self.errors.set_callback(callback);
    }

    fn lock(&self) -> LogResult<MutexGuard<'_, ServerState>> {
        self.state.lock().map_err(|_| LogError::LockPoisoned {
            channel: Channel::Server,
        })
    }
}
