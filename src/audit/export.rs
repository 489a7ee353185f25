//! Export of audit query results as JSON or CSV.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::SecondsFormat;
use tracing::info;

use crate::error::LogResult;

use super::entry::AuditEntry;
use super::logger::AuditLogger;
use super::query::QueryOptions;

/// Fixed CSV column header.
pub const CSV_HEADER: &str =
    "id,time,event,category,severity,actor_username,actor_ip,target_type,target_name,result,reason";

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Indented JSON array.
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

/// Quote a CSV field when it contains a comma, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(entry: &AuditEntry) -> String {
    let time = entry
        .time
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default();
    let (target_type, target_name) = entry
        .target
        .as_ref()
        .map(|t| (t.kind.as_str(), t.name.as_str()))
        .unwrap_or(("", ""));

    let columns = [
        entry.id.as_str(),
        time.as_str(),
        entry.event.as_str(),
        entry.category.as_str(),
        entry.severity.as_str(),
        entry.actor.username.as_str(),
        entry.actor.ip.as_str(),
        target_type,
        target_name,
        entry.result.as_str(),
        entry.reason.as_deref().unwrap_or(""),
    ];
    columns
        .iter()
        .map(|c| csv_field(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Serialize `entries` to `out` in the given format.
pub fn write_entries(
    entries: &[AuditEntry],
    format: ExportFormat,
    out: &mut dyn Write,
) -> LogResult<()> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, entries)?;
            writeln!(out)?;
        }
        ExportFormat::Csv => {
            writeln!(out, "{}", CSV_HEADER)?;
            for entry in entries {
                writeln!(out, "{}", csv_row(entry))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

impl AuditLogger {
    /// Run `options` as a query and write the page to `out`.
    ///
    /// Returns the number of exported entries.
    pub fn export(
        &self,
        options: &QueryOptions,
        format: ExportFormat,
        out: &mut dyn Write,
    ) -> LogResult<usize> {
        let result = self.query(options)?;
        write_entries(&result.entries, format, out)?;
        info!(count = result.count, format = %format, "Audit entries exported");
        Ok(result.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{Actor, Category, Severity, Target};
    use chrono::{TimeZone, Utc};

    fn entry() -> AuditEntry {
        let mut e = AuditEntry::new(
            "org.member_removed",
            Category::Organization,
            Severity::Warn,
            Actor::user("u1", "ops", "10.2.0.1"),
        )
        .with_target(Target::new("organization", "o1", "Acme, Inc."))
        .failed("said \"no\"")
        .at(Utc.with_ymd_and_hms(2024, 7, 4, 9, 0, 0).unwrap());
        e.id = "aud_X".to_string();
        e
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_export() {
        let mut out = Vec::new();
        write_entries(&[entry()], ExportFormat::Csv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "aud_X,2024-07-04T09:00:00Z,org.member_removed,organization,warn,ops,10.2.0.1,organization,\"Acme, Inc.\",failure,\"said \"\"no\"\"\""
        );
    }

    #[test]
    fn test_json_export_is_indented_array() {
        let mut out = Vec::new();
        write_entries(&[entry(), entry()], ExportFormat::Json, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("[\n  {"));
        let parsed: Vec<AuditEntry> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].event, "org.member_removed");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
