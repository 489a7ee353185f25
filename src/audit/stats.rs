//! Aggregate statistics over the audit file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::LogResult;

use super::entry::AuditEntry;
use super::logger::AuditLogger;
use super::store;

/// Counts accumulated in a single pass over the audit file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditStats {
    pub total: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub by_category: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_result: BTreeMap<String, usize>,
    /// Lines that could not be parsed.
    pub skipped: usize,
}

impl AuditStats {
    /// Fold one entry into the totals.
    pub fn record(&mut self, entry: &AuditEntry) {
        self.total += 1;
        if let Some(time) = entry.time {
            if self.oldest.map_or(true, |t| time < t) {
                self.oldest = Some(time);
            }
            if self.newest.map_or(true, |t| time > t) {
                self.newest = Some(time);
            }
        }
        *self
            .by_category
            .entry(entry.category.to_string())
            .or_insert(0) += 1;
        *self
            .by_severity
            .entry(entry.severity.to_string())
            .or_insert(0) += 1;
        *self.by_result.entry(entry.result.to_string()).or_insert(0) += 1;
    }
}

impl AuditLogger {
    /// Compute statistics for the whole audit file.
    pub fn stats(&self) -> LogResult<AuditStats> {
        let state = self.lock()?;
        let mut stats = AuditStats::default();
        let summary = store::scan(state.file.path(), |entry| stats.record(&entry))?;
        stats.skipped = summary.skipped;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{Actor, Category, Severity};
    use crate::audit::logger::AuditOptions;
    use chrono::TimeZone;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_stats_single_pass() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let logger = AuditLogger::new(&path, AuditOptions::default()).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        logger.log(
            AuditEntry::new("auth.login", Category::Authentication, Severity::Info, Actor::system())
                .at(t1),
        );
        logger.log(
            AuditEntry::new(
                "auth.login_failed",
                Category::Authentication,
                Severity::Warn,
                Actor::anonymous("10.0.0.9"),
            )
            .failed("bad password")
            .at(t0),
        );
        logger.log(
            AuditEntry::new("backup.failed", Category::Backup, Severity::Error, Actor::system())
                .failed("disk full")
                .at(t1),
        );
        OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"garbage\n")
            .unwrap();

        let stats = logger.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.oldest, Some(t0));
        assert_eq!(stats.newest, Some(t1));
        assert_eq!(stats.by_category["authentication"], 2);
        assert_eq!(stats.by_category["backup"], 1);
        assert_eq!(stats.by_severity["warn"], 1);
        assert_eq!(stats.by_result["failure"], 2);
        assert_eq!(stats.by_result["success"], 1);
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let logger =
            AuditLogger::new(&dir.path().join("audit.log"), AuditOptions::default()).unwrap();
        assert_eq!(logger.stats().unwrap(), AuditStats::default());
    }
}
