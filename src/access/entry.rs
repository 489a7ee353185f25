//! Access log entry and output formats.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: String,
    pub protocol: String,
    pub status: u16,
    /// Response body size in bytes.
    pub body_size: u64,
    /// Total bytes written to the client, headers included.
    pub bytes_sent: u64,
    #[serde(default)]
    pub referer: String,
    #[serde(default)]
    pub user_agent: String,
    /// Request latency in microseconds.
    pub latency_us: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_proto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cipher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_requests: Option<u64>,
}

impl AccessEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        client_ip: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            client_ip: client_ip.into(),
            method: method.into(),
            path: path.into(),
            query: String::new(),
            protocol: "HTTP/1.1".to_string(),
            status,
            body_size: 0,
            bytes_sent: 0,
            referer: String::new(),
            user_agent: String::new(),
            latency_us: 0,
            request_id: None,
            remote_user: None,
            host: None,
            forwarded_for: None,
            forwarded_proto: None,
            tls_protocol: None,
            tls_cipher: None,
            connection_id: None,
            connection_requests: None,
        }
    }

    /// Path followed by `?query` when a query string is present.
    pub fn request_uri(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// The `METHOD uri protocol` request line.
    pub fn request_line(&self) -> String {
        format!(
            "{} {} {}",
            dash(&self.method),
            dash(&self.request_uri()),
            dash(&self.protocol)
        )
    }
}

/// Placeholder for empty text fields, per Common Log Format convention.
pub(crate) fn dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// Output layout of the access channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessFormat {
    /// Apache combined: common plus referer and user agent.
    #[default]
    Combined,
    /// Apache common log format.
    Common,
    /// One JSON object per request.
    Json,
    /// Operator-supplied `$token` template.
    Custom,
}

impl AccessFormat {
    /// Parse a format name, falling back to `Combined` for unknown names.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(format = %s, "Unknown access log format; using combined");
            Self::Combined
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::Common => "common",
            Self::Json => "json",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for AccessFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combined" => Ok(Self::Combined),
            "common" => Ok(Self::Common),
            "json" => Ok(Self::Json),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown access log format: {}", other)),
        }
    }
}

impl fmt::Display for AccessFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
