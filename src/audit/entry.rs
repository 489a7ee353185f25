//! Audit entry types.
//!
//! Defines the persisted structure of audit records. Every record is one
//! JSON object on its own line.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::{FieldValue, Fields};

/// Closed taxonomy of audit categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Authentication,
    Admin,
    Configuration,
    Users,
    Security,
    #[serde(alias = "data")]
    Backup,
    System,
    Tokens,
    Cluster,
    Organization,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Self::Authentication,
        Self::Admin,
        Self::Configuration,
        Self::Users,
        Self::Security,
        Self::Backup,
        Self::System,
        Self::Tokens,
        Self::Cluster,
        Self::Organization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Admin => "admin",
            Self::Configuration => "configuration",
            Self::Users => "users",
            Self::Security => "security",
            Self::Backup => "backup",
            Self::System => "system",
            Self::Tokens => "tokens",
            Self::Cluster => "cluster",
            Self::Organization => "organization",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "data" {
            return Ok(Self::Backup);
        }
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown audit category: {}", s))
    }
}

/// Audit severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown audit severity: {}", other)),
        }
    }
}

/// Outcome of an audited action.
///
/// Persisted as a plain string; anything other than `success` or
/// `failure` round-trips through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditResult {
    #[default]
    Success,
    Failure,
    Other(String),
}

impl AuditResult {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for AuditResult {
    fn from(s: String) -> Self {
        match s.as_str() {
            "success" => Self::Success,
            "failure" => Self::Failure,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for AuditResult {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<AuditResult> for String {
    fn from(r: AuditResult) -> Self {
        match r {
            AuditResult::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed the action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub user_agent: String,
}

impl Actor {
    /// A panel user or admin identified by account.
    pub fn user(id: impl Into<String>, username: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            kind: "user".to_string(),
            id: id.into(),
            username: username.into(),
            ip: ip.into(),
            user_agent: String::new(),
        }
    }

    /// An API token acting on its own.
    pub fn token(id: impl Into<String>, name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            kind: "token".to_string(),
            ..Self::user(id, name, ip)
        }
    }

    /// The server itself (schedulers, startup, cluster events).
    pub fn system() -> Self {
        Self {
            kind: "system".to_string(),
            id: "system".to_string(),
            username: "system".to_string(),
            ..Default::default()
        }
    }

    /// An unauthenticated remote party known only by address.
    pub fn anonymous(ip: impl Into<String>) -> Self {
        Self {
            kind: "anonymous".to_string(),
            ip: ip.into(),
            ..Default::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// What the action was performed on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Target {
    pub fn new(kind: impl Into<String>, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A single audit record.
///
/// `id` and `time` may be left unset by callers; the logger fills both
/// before the entry is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    pub event: String,
    pub category: Category,
    pub severity: Severity,
    #[serde(default)]
    pub actor: Actor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(default, skip_serializing_if = "Fields::is_empty")]
    pub details: Fields,
    #[serde(default)]
    pub result: AuditResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEntry {
    /// Create a successful entry with no target, id or time.
    pub fn new(
        event: impl Into<String>,
        category: Category,
        severity: Severity,
        actor: Actor,
    ) -> Self {
        Self {
            id: String::new(),
            time: None,
            event: event.into(),
            category,
            severity,
            actor,
            target: None,
            details: Fields::new(),
            result: AuditResult::Success,
            node_id: None,
            reason: None,
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.details.insert(key, value);
        self
    }

    pub fn with_details(mut self, details: Fields) -> Self {
        self.details = details;
        self
    }

    pub fn with_result(mut self, result: AuditResult) -> Self {
        self.result = result;
        self
    }

    /// Mark the entry as a failure with the given reason.
    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.result = AuditResult::Failure;
        self.reason = Some(reason.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Entry time, with unset times ordering before everything else.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.time.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    /// One-line human summary used for the console mirror.
    pub fn summary(&self) -> String {
        let actor = if self.actor.username.is_empty() {
            self.actor.ip.as_str()
        } else {
            self.actor.username.as_str()
        };
        let mut line = format!(
            "[AUDIT] {} {} {} actor={} result={}",
            self.timestamp().to_rfc3339_opts(SecondsFormat::Secs, true),
            self.severity,
            self.event,
            if actor.is_empty() { "-" } else { actor },
            self.result
        );
        if let Some(ref target) = self.target {
            line.push_str(&format!(" target={}:{}", target.kind, target.name));
        }
        line
    }
}
