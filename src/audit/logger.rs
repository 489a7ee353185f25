//! Audit logger for writing audit entries to file.
//!
//! Writes structured audit entries as JSON lines (one JSON object per line)
//! for easy parsing by log analysis tools.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, warn};

use crate::channel::{Channel, ChannelFile, ErrorCallback, WriteErrorSink};
use crate::error::{LogError, LogResult};

use super::entry::AuditEntry;
use super::id::{IdGenerator, DEFAULT_ID_PREFIX};
use super::sanitize::sanitize_details;

/// Construction options for [`AuditLogger`].
#[derive(Debug, Clone)]
pub struct AuditOptions {
    /// Mirror a one-line summary of each entry to stdout.
    pub console: bool,
    /// Stamped on entries that carry no node id of their own.
    pub node_id: Option<String>,
    /// Prefix of generated entry ids.
    pub id_prefix: String,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            console: false,
            node_id: None,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
        }
    }
}

pub(super) struct AuditState {
    pub(super) file: ChannelFile,
    ids: IdGenerator,
    node_id: Option<String>,
    console: bool,
}

/// Logger for audit entries.
///
/// One mutex guards the file handle, the id generator and every read or
/// rewrite of the file, so queries never observe a half-written line and
/// compaction never races a write.
pub struct AuditLogger {
    state: Mutex<AuditState>,
    path: PathBuf,
    errors: WriteErrorSink,
}

impl AuditLogger {
    /// Create a new audit logger that appends to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// file cannot be opened for appending.
    pub fn new(path: &Path, options: AuditOptions) -> LogResult<Self> {
        let file = ChannelFile::open(Channel::Audit, path)?;
        debug!(path = %path.display(), "Audit logger initialized");

        Ok(Self {
            state: Mutex::new(AuditState {
                file,
                ids: IdGenerator::new(options.id_prefix),
                node_id: options.node_id.filter(|n| !n.is_empty()),
                console: options.console,
            }),
            path: path.to_path_buf(),
            errors: WriteErrorSink::new(Channel::Audit),
        })
    }

    /// Replace the id generator, e.g. with deterministic entropy.
    pub fn set_id_generator(&self, ids: IdGenerator) {
        if let Ok(mut state) = self.lock() {
            state.ids = ids;
        }
    }

    pub fn set_console(&self, console: bool) {
        if let Ok(mut state) = self.lock() {
            state.console = console;
        }
    }

    /// Record an entry and return it as written.
    ///
    /// Fills a missing time (now) and id, stamps the configured node id
    /// when the entry has none, and redacts sensitive details. A write
    /// failure is reported to the error sink; the returned entry is still
    /// the fully stamped one.
    pub fn log(&self, mut entry: AuditEntry) -> AuditEntry {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                self.errors.report(e);
                return entry;
            }
        };

        let time = *entry.time.get_or_insert_with(Utc::now);
        if entry.id.is_empty() {
            entry.id = state.ids.generate(time);
        }
        if entry.node_id.is_none() {
            entry.node_id = state.node_id.clone();
        }
        sanitize_details(&mut entry.details);

        if let Err(e) = Self::write_entry(&mut state, &entry) {
            drop(state);
            self.errors.report(e);
        }
        entry
    }

    fn write_entry(state: &mut AuditState, entry: &AuditEntry) -> LogResult<()> {
        let json = serde_json::to_string(entry)?;
        if state.console {
            let _ = writeln!(std::io::stdout().lock(), "{}", entry.summary());
        }
        state.file.append_line(&json)?;
        if let Err(e) = state.file.sync() {
            warn!(error = %e, "Failed to sync audit log");
        }
        Ok(())
    }

    /// Path to the audit log file.
    pub fn path(&self) -> &Path {
        &self.path
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

    pub(super) fn lock(&self) -> LogResult<MutexGuard<'_, AuditState>> {
        self.state.lock().map_err(|_| LogError::LockPoisoned {
            channel: Channel::Audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{Actor, Category, Severity};
    use crate::audit::id::SequenceEntropy;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_entry() -> AuditEntry {
        AuditEntry::new(
            "config.changed",
            Category::Configuration,
            Severity::Warn,
            Actor::user("u1", "admin", "10.0.0.1"),
        )
    }

    #[test]
    fn test_logger_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("subdir/audit.log");

        let logger = AuditLogger::new(&log_path, AuditOptions::default()).unwrap();
        assert!(log_path.parent().unwrap().exists());
        assert_eq!(logger.path(), log_path);
    }

    #[test]
    fn test_log_fills_id_time_and_node() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");
        let options = AuditOptions {
            node_id: Some("node-a".to_string()),
            ..Default::default()
        };
        let logger = AuditLogger::new(&log_path, options).unwrap();

        let written = logger.log(create_test_entry());
        assert!(written.id.starts_with("aud_"));
        assert!(written.time.is_some());
        assert_eq!(written.node_id.as_deref(), Some("node-a"));

        let content = fs::read_to_string(&log_path).unwrap();
        let parsed: AuditEntry = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed, written);
    }

    #[test]
    fn test_log_keeps_caller_id_time_and_node() {
        let temp_dir = TempDir::new().unwrap();
        let options = AuditOptions {
            node_id: Some("node-a".to_string()),
            ..Default::default()
        };
        let logger = AuditLogger::new(&temp_dir.path().join("audit.log"), options).unwrap();
        let time = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();

        let mut entry = create_test_entry().at(time).with_node("node-b");
        entry.id = "aud_custom".to_string();
        let written = logger.log(entry);

        assert_eq!(written.id, "aud_custom");
        assert_eq!(written.time, Some(time));
        assert_eq!(written.node_id.as_deref(), Some("node-b"));
    }

    #[test]
    fn test_log_redacts_details() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");
        let logger = AuditLogger::new(&log_path, AuditOptions::default()).unwrap();

        logger.log(create_test_entry().with_detail("smtp_password", "hunter2"));

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(!content.contains("hunter2"));
        assert!(content.contains("[REDACTED]"));
    }

    #[test]
    fn test_deterministic_ids() {
        let temp_dir = TempDir::new().unwrap();
        let logger =
            AuditLogger::new(&temp_dir.path().join("audit.log"), AuditOptions::default()).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap();

        logger.set_id_generator(IdGenerator::with_entropy(
            "evt-",
            Box::new(SequenceEntropy::new(0)),
        ));
        let first = logger.log(create_test_entry().at(time));

        let mut expected = IdGenerator::with_entropy("evt-", Box::new(SequenceEntropy::new(0)));
        assert_eq!(first.id, expected.generate(time));
    }

    #[test]
    fn test_logger_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");

        {
            let logger = AuditLogger::new(&log_path, AuditOptions::default()).unwrap();
            logger.log(create_test_entry());
        }
        {
            let logger = AuditLogger::new(&log_path, AuditOptions::default()).unwrap();
            logger.log(create_test_entry());
        }

        let content = fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_write_after_close_is_counted() {
        let temp_dir = TempDir::new().unwrap();
        let logger =
            AuditLogger::new(&temp_dir.path().join("audit.log"), AuditOptions::default()).unwrap();
        logger.close().unwrap();

        let written = logger.log(create_test_entry());
        assert!(!written.id.is_empty());
        assert_eq!(logger.write_failures(), 1);
    }
}
