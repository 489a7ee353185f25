//! Debug logger, disabled unless explicitly enabled.

use std::panic::Location;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::channel::{Channel, ChannelFile, ErrorCallback, Fields, WriteErrorSink};
use crate::error::{LogError, LogResult};

use super::entry::DebugEntry;
use super::level::{Level, LineFormat};

struct DebugState {
    file: ChannelFile,
    enabled: bool,
    min_level: Level,
    format: LineFormat,
}

/// Logger for developer traces.
///
/// No file handle is held while disabled; `enable` opens the file and
/// `disable` closes it. Every logging call is a no-op while disabled.
pub struct DebugLogger {
    state: Mutex<DebugState>,
    errors: WriteErrorSink,
}

impl DebugLogger {
    /// Create a disabled debug logger bound to `path`.
    pub fn new(path: &Path, format: LineFormat) -> Self {
        Self {
            state: Mutex::new(DebugState {
                file: ChannelFile::closed(Channel::Debug, path),
                enabled: false,
                min_level: Level::Debug,
                format,
            }),
            errors: WriteErrorSink::new(Channel::Debug),
        }
    }

    /// Open the debug file and start accepting entries.
    pub fn enable(&self) -> LogResult<()> {
        let mut state = self.lock()?;
        state.file.reopen()?;
        state.enabled = true;
        info!(path = %state.file.path().display(), "Debug logging enabled");
        Ok(())
    }

    /// Stop accepting entries and release the file handle.
    pub fn disable(&self) -> LogResult<()> {
        let mut state = self.lock()?;
        state.enabled = false;
        state.file.close()?;
        info!("Debug logging disabled");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().map(|s| s.enabled).unwrap_or(false)
    }

    /// Whether a file handle is currently held.
    pub fn has_open_file(&self) -> bool {
        self.lock().map(|s| s.file.is_open()).unwrap_or(false)
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

    /// Write an entry if enabled and at or above the floor.
    pub fn log(&self, mut entry: DebugEntry) {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => return self.errors.report(e),
        };
        if !state.enabled {
            return;
        }
        entry.normalize();
        if entry.level.unwrap_or(Level::Debug) < state.min_level {
            return;
        }

        let line = match state.format {
            LineFormat::Json => match serde_json::to_string(&entry) {
                Ok(line) => line,
                Err(e) => return self.errors.report(e.into()),
            },
            LineFormat::Text => entry.to_text(),
        };
        if let Err(e) = state.file.append_line(&line) {
            self.errors.report(e);
        }
    }

    /// Log a message tagged with the caller's file and line.
    #[track_caller]
    pub fn debug(&self, message: &str) {
        let caller = Location::caller();
        if !self.is_enabled() {
            return;
        }
        self.log(DebugEntry::new(message).with_caller(caller.file(), caller.line()));
    }

    /// Log a trace entry naming the function it was emitted from.
    #[track_caller]
    pub fn trace(&self, function: &str, message: &str, fields: Fields) {
        let caller = Location::caller();
        if !self.is_enabled() {
            return;
        }
        self.log(
            DebugEntry::new(message)
                .with_caller(caller.file(), caller.line())
                .with_function(function)
                .with_fields(fields),
        );
    }

    /// Rotate the debug file. A no-op while disabled.
    pub fn rotate(&self) -> LogResult<()> {
        self.lock()?.file.rotate().map(|_| ())
    }

    pub fn close(&self) -> LogResult<()> {
        let mut state = self.lock()?;
        state.enabled = false;
        state.file.close()
    }

    pub fn write_failures(&self) -> u64 {
        self.errors.failures()
    }

    pub fn on_write_error(&self, callback: ErrorCallback) {
        self.errors.set_callback(callback);
    }

    fn lock(&self) -> LogResult<MutexGuard<'_, DebugState>> {
        self.state.lock().map_err(|_| LogError::LockPoisoned {
            channel: Channel::Debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_disabled_by_default_without_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.log");
        let logger = DebugLogger::new(&path, LineFormat::Text);

        assert!(!logger.is_enabled());
        assert!(!logger.has_open_file());

        logger.debug("ignored");
        assert!(!path.exists());
        assert_eq!(logger.write_failures(), 0);
    }

    #[test]
    fn test_enable_opens_and_disable_closes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.log");
        let logger = DebugLogger::new(&path, LineFormat::Text);

        logger.enable().unwrap();
        assert!(logger.has_open_file());
        logger.debug("visible");

        logger.disable().unwrap();
        assert!(!logger.has_open_file());
        logger.debug("invisible");

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("debug.rs:"));
        assert!(content.contains("visible"));
    }

    #[test]
    fn test_trace_records_function() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.log");
        let logger = DebugLogger::new(&path, LineFormat::Json);
        logger.enable().unwrap();

        logger.trace("resolve_site", "matched", Fields::new().with("host", "a.example"));

        let parsed: DebugEntry =
            serde_json::from_str(fs::read_to_string(&path).unwrap().trim()).unwrap();
        assert_eq!(parsed.function.as_deref(), Some("resolve_site"));
        assert_eq!(parsed.level, Some(Level::Debug));
        assert!(parsed.file.unwrap().ends_with("debug.rs"));
    }

    #[test]
    fn test_rotate_while_disabled_is_noop() {
        let dir = TempDir::new().unwrap();
        let logger = DebugLogger::new(&dir.path().join("debug.log"), LineFormat::Text);
        logger.rotate().unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
