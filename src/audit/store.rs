//! Line-oriented reading of the audit file.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::LogResult;

use super::entry::AuditEntry;

/// Counts from one pass over the audit file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanSummary {
    pub parsed: usize,
    pub skipped: usize,
}

/// Stream every parseable entry of `path` into `visit`.
///
/// Blank lines are ignored; lines that fail to decode are counted and
/// skipped. A missing file reads as empty.
pub(crate) fn scan(path: &Path, mut visit: impl FnMut(AuditEntry)) -> LogResult<ScanSummary> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ScanSummary::default()),
        Err(e) => return Err(e.into()),
    };

    let mut summary = ScanSummary::default();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                debug!(line = index + 1, error = %e, "Unreadable audit line");
                summary.skipped += 1;
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(line) {
            Ok(entry) => {
                summary.parsed += 1;
                visit(entry);
            }
            Err(e) => {
                debug!(line = index + 1, error = %e, "Corrupt audit line");
                summary.skipped += 1;
            }
        }
    }

    if summary.skipped > 0 {
        warn!(
            path = %path.display(),
            skipped = summary.skipped,
            "Skipped corrupt audit lines"
        );
    }
    Ok(summary)
}

/// Load every parseable entry in file order.
pub(crate) fn load(path: &Path) -> LogResult<Vec<AuditEntry>> {
    let mut entries = Vec::new();
    scan(path, |entry| entries.push(entry))?;
    Ok(entries)
}
