//! Filtering and pagination over the audit file.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::LogResult;

use super::entry::{AuditEntry, AuditResult, Category, Severity};
use super::logger::AuditLogger;
use super::store;

/// Filter parameters for querying stored audit entries.
///
/// Unset filters match everything. `limit == 0` means no limit.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub category: Option<Category>,
    /// Exact event name, e.g. `user.created`.
    pub event: Option<String>,
    pub actor_username: Option<String>,
    pub actor_ip: Option<String>,
    pub target_type: Option<String>,
    pub target_name: Option<String>,
    pub result: Option<AuditResult>,
    pub severity: Option<Severity>,
    /// Start of time range (inclusive).
    pub start: Option<DateTime<Utc>>,
    /// End of time range (inclusive).
    pub end: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

impl QueryOptions {
    /// Check whether an entry matches all active filters.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(category) = self.category {
            if entry.category != category {
                return false;
            }
        }
        if let Some(ref event) = self.event {
            if entry.event != *event {
                return false;
            }
        }
        if let Some(ref username) = self.actor_username {
            if entry.actor.username != *username {
                return false;
            }
        }
        if let Some(ref ip) = self.actor_ip {
            if entry.actor.ip != *ip {
                return false;
            }
        }
        if let Some(ref kind) = self.target_type {
            if entry.target.as_ref().map(|t| &t.kind) != Some(kind) {
                return false;
            }
        }
        if let Some(ref name) = self.target_name {
            if entry.target.as_ref().map(|t| &t.name) != Some(name) {
                return false;
            }
        }
        if let Some(ref result) = self.result {
            if entry.result != *result {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if entry.severity != severity {
                return false;
            }
        }
        if let Some(start) = self.start {
            if entry.timestamp() < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if entry.timestamp() > end {
                return false;
            }
        }
        true
    }

    /// Select, order (newest first) and paginate `entries`.
    pub fn apply(&self, entries: impl IntoIterator<Item = AuditEntry>) -> (usize, Vec<AuditEntry>) {
        let mut matched: Vec<AuditEntry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        let total = matched.len();

        matched.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

        let page = matched.into_iter().skip(self.offset);
        let page: Vec<AuditEntry> = if self.limit > 0 {
            page.take(self.limit).collect()
        } else {
            page.collect()
        };
        (total, page)
    }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Matches before pagination.
    pub total: usize,
    /// Entries in this page.
    pub count: usize,
    pub entries: Vec<AuditEntry>,
    pub elapsed: Duration,
}

impl AuditLogger {
    /// Query the audit file.
    ///
    /// Holds the channel lock for the whole scan, so concurrent writers
    /// wait until the query completes.
    pub fn query(&self, options: &QueryOptions) -> LogResult<QueryResult> {
        let started = Instant::now();
        let state = self.lock()?;

        let mut matched = Vec::new();
        store::scan(state.file.path(), |entry| {
            if options.matches(&entry) {
                matched.push(entry);
            }
        })?;
        drop(state);

        let (total, entries) = options.apply(matched);
        let elapsed = started.elapsed();
        debug!(total, count = entries.len(), ?elapsed, "Audit query finished");

        Ok(QueryResult {
            total,
            count: entries.len(),
            entries,
            elapsed,
        })
    }
}
