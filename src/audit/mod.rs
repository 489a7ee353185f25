//! Audit store.
//!
//! An append-only JSON Lines file of audit records with querying, export,
//! statistics and retention compaction.
//!
//! ## Features
//!
//! - Time-sortable, prefixed entry ids with injectable entropy
//! - Automatic redaction of sensitive detail keys
//! - Per-action helpers encoding category and severity policy
//! - Reads and rewrites serialized with writes on the channel lock

mod entry;
mod export;
mod helpers;
mod id;
mod logger;
mod query;
mod retention;
mod sanitize;
mod stats;
mod store;

pub use entry::{Actor, AuditEntry, AuditResult, Category, Severity, Target};
pub use export::{write_entries, ExportFormat, CSV_HEADER};
pub use id::{EntropySource, IdGenerator, RandomEntropy, SequenceEntropy, DEFAULT_ID_PREFIX};
pub use logger::{AuditLogger, AuditOptions};
pub use query::{QueryOptions, QueryResult};
pub use retention::RetentionPolicy;
pub use sanitize::{is_sensitive_key, sanitize_details};
pub use stats::AuditStats;
