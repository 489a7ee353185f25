//! Retention policy and compaction of the audit file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{LogError, LogResult};

use super::entry::AuditEntry;
use super::logger::AuditLogger;
use super::store;

/// Rules deciding which entries survive a compaction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    /// Entries older than this are dropped. Zero disables the age test.
    pub max_age: Duration,
    /// Upper bound on surviving entries. Zero disables the cap.
    pub max_entries: usize,
    /// Keep every critical entry regardless of age or cap.
    pub preserve_critical: bool,
}

impl RetentionPolicy {
    pub fn from_days(max_age_days: u64, max_entries: usize, preserve_critical: bool) -> Self {
        Self {
            max_age: Duration::from_secs(max_age_days.saturating_mul(24 * 60 * 60)),
            max_entries,
            preserve_critical,
        }
    }

    /// Select the survivors of `entries` at `now`, oldest first.
    pub fn apply(&self, entries: Vec<AuditEntry>, now: DateTime<Utc>) -> Vec<AuditEntry> {
        let keep_critical = |e: &AuditEntry| self.preserve_critical && e.is_critical();

        let mut survivors: Vec<AuditEntry> = if self.max_age.is_zero() {
            entries
        } else {
            let cutoff = chrono::Duration::from_std(self.max_age)
                .ok()
                .and_then(|age| now.checked_sub_signed(age))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            entries
                .into_iter()
                .filter(|e| e.timestamp() > cutoff || keep_critical(e))
                .collect()
        };

        if self.max_entries > 0 && survivors.len() > self.max_entries {
            // Newest first so truncation drops the oldest.
            survivors.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
            if self.preserve_critical {
                let (critical, mut rest): (Vec<_>, Vec<_>) =
                    survivors.into_iter().partition(|e| e.is_critical());
                rest.truncate(self.max_entries.saturating_sub(critical.len()));
                survivors = critical;
                survivors.extend(rest);
            } else {
                survivors.truncate(self.max_entries);
            }
        }

        survivors.sort_by_key(|e| e.timestamp());
        survivors
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".compact");
    PathBuf::from(s)
}

fn write_all(path: &Path, entries: &[AuditEntry]) -> LogResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for entry in entries {
        serde_json::to_writer(&mut out, entry)?;
        out.write_all(b"\n")?;
    }
    let file = out.into_inner().map_err(|e| LogError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

impl AuditLogger {
    /// Apply `policy` now. Returns the number of entries removed.
    pub fn cleanup(&self, policy: &RetentionPolicy) -> LogResult<usize> {
        self.cleanup_at(policy, Utc::now())
    }

    /// Apply `policy` as of `now`.
    ///
    /// When anything is removed, survivors are written to a sibling file
    /// which then replaces the audit file and the append handle is
    /// reopened. Unparseable lines do not survive a rewrite. The channel
    /// lock is held throughout.
    pub fn cleanup_at(&self, policy: &RetentionPolicy, now: DateTime<Utc>) -> LogResult<usize> {
        let mut state = self.lock()?;
        let path = state.file.path().to_path_buf();

        let entries = store::load(&path)?;
        let before = entries.len();
        let survivors = policy.apply(entries, now);
        let removed = before - survivors.len();

        if removed == 0 {
            return Ok(0);
        }

        let tmp = temp_path(&path);
        if let Err(e) = write_all(&tmp, &survivors) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        if let Err(e) = state.file.close() {
            warn!(path = %path.display(), error = %e, "Audit close before compaction failed");
            let _ = fs::remove_file(&tmp);
            state.file.reopen()?;
            return Err(e);
        }
        let renamed = fs::rename(&tmp, &path);
        state.file.reopen()?;
        if let Err(e) = renamed {
            warn!(path = %path.display(), error = %e, "Audit compaction rename failed");
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!(
            removed,
            kept = survivors.len(),
            path = %path.display(),
            "Audit log compacted"
        );
        Ok(removed)
    }
}
