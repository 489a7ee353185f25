//! Entry types of the server, error and debug channels.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::Fields;

use super::level::Level;

fn text_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn push_fields(line: &mut String, fields: &Fields) {
    if !fields.is_empty() {
        line.push(' ');
        line.push_str(&fields.to_text());
    }
}

/// A general server diagnostics entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    #[serde(default, skip_serializing_if = "Fields::is_empty")]
    pub fields: Fields,
}

impl ServerEntry {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            level,
            message: message.into(),
            fields: Fields::new(),
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// `time [LEVEL] message key=value ...`
    pub fn to_text(&self) -> String {
        let mut line = format!("{} [{}] {}", text_time(&self.time), self.level, self.message);
        push_fields(&mut line, &self.fields);
        line
    }
}

/// An error report.
///
/// `time` and `level` default to now and `ERROR` when the logger writes
/// the entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub level: Option<Level>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Fields::is_empty")]
    pub fields: Fields,
}

impl ErrorEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Attach an error and its source chain as `outer: inner: ...`.
    pub fn with_error(mut self, err: &dyn std::error::Error) -> Self {
        let mut text = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.error = Some(text);
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Fill unset time and level.
    pub(crate) fn normalize(&mut self) {
        self.time.get_or_insert_with(Utc::now);
        self.level.get_or_insert(Level::Error);
    }

    /// `time [LEVEL] message | error=... | at file:line key=value`,
    /// followed by tab-indented stack lines.
    pub fn to_text(&self) -> String {
        let time = self.time.unwrap_or_else(Utc::now);
        let mut line = format!(
            "{} [{}] {}",
            text_time(&time),
            self.level.unwrap_or(Level::Error),
            self.message
        );
        if let Some(ref error) = self.error {
            line.push_str(" | error=");
            line.push_str(error);
        }
        if let Some(ref file) = self.file {
            line.push_str(" | at ");
            line.push_str(file);
            if let Some(n) = self.line {
                line.push_str(&format!(":{}", n));
            }
        }
        push_fields(&mut line, &self.fields);
        if let Some(ref stack) = self.stack {
            for frame in stack.lines().filter(|l| !l.trim().is_empty()) {
                line.push_str("\n\t");
                line.push_str(frame.trim_end());
            }
        }
        line
    }
}

/// A developer trace entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugEntry {
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub level: Option<Level>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Fields::is_empty")]
    pub fields: Fields,
}

impl DebugEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_caller(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub(crate) fn normalize(&mut self) {
        self.time.get_or_insert_with(Utc::now);
        self.level.get_or_insert(Level::Debug);
    }

    /// `time [LEVEL] file:line function() message key=value`
    pub fn to_text(&self) -> String {
        let time = self.time.unwrap_or_else(Utc::now);
        let mut line = format!(
            "{} [{}]",
            text_time(&time),
            self.level.unwrap_or(Level::Debug)
        );
        if let Some(ref file) = self.file {
            line.push(' ');
            line.push_str(file);
            if let Some(n) = self.line {
                line.push_str(&format!(":{}", n));
            }
        }
        if let Some(ref function) = self.function {
            line.push_str(&format!(" {}()", function));
        }
        line.push(' ');
        line.push_str(&self.message);
        push_fields(&mut line, &self.fields);
        line
    }
}
