//! Security event vocabulary and entry layout.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of security events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEvent {
    LoginFailed,
    LoginSuccess,
    RateLimited,
    Blocked,
    Suspicious,
    BruteForce,
    InvalidToken,
    CsrfViolation,
}

impl SecurityEvent {
    pub const ALL: [SecurityEvent; 8] = [
        Self::LoginFailed,
        Self::LoginSuccess,
        Self::RateLimited,
        Self::Blocked,
        Self::Suspicious,
        Self::BruteForce,
        Self::InvalidToken,
        Self::CsrfViolation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginFailed => "LOGIN_FAILED",
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::RateLimited => "RATE_LIMITED",
            Self::Blocked => "BLOCKED",
            Self::Suspicious => "SUSPICIOUS",
            Self::BruteForce => "BRUTE_FORCE",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::CsrfViolation => "CSRF_VIOLATION",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown security event: {}", s))
    }
}

/// One security log record.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityEntry {
    pub time: DateTime<Utc>,
    pub event: SecurityEvent,
    pub ip: String,
    pub user: Option<String>,
    pub path: Option<String>,
    pub details: Option<String>,
}

impl SecurityEntry {
    pub fn new(event: SecurityEvent, ip: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            event,
            ip: ip.into(),
            user: None,
            path: None,
            details: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// `<time> [<EVENT>] IP=<ip>[ USER=<u>][ PATH=<p>][ DETAILS=<d>]`
    ///
    /// Empty optional parts are omitted.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} [{}] IP={}",
            self.time.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.event,
            self.ip
        );
        let parts = [
            ("USER", &self.user),
            ("PATH", &self.path),
            ("DETAILS", &self.details),
        ];
        for (key, value) in parts {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                line.push(' ');
                line.push_str(key);
                line.push('=');
                line.push_str(value);
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_names() {
        assert_eq!(SecurityEvent::CsrfViolation.to_string(), "CSRF_VIOLATION");
        assert_eq!(
            serde_json::to_string(&SecurityEvent::BruteForce).unwrap(),
            "\"BRUTE_FORCE\""
        );
        assert_eq!(
            "login_failed".parse::<SecurityEvent>(),
            Ok(SecurityEvent::LoginFailed)
        );
    }

    #[test]
    fn test_line_with_all_parts() {
        let mut entry = SecurityEntry::new(SecurityEvent::LoginFailed, "203.0.113.9")
            .with_user("alice")
            .with_path("/login")
            .with_details("bad password");
        entry.time = Utc.with_ymd_and_hms(2024, 3, 2, 11, 0, 5).unwrap();

        assert_eq!(
            entry.to_line(),
            "2024-03-02T11:00:05Z [LOGIN_FAILED] IP=203.0.113.9 USER=alice PATH=/login DETAILS=bad password"
        );
    }

    #[test]
    fn test_line_omits_missing_and_empty_parts() {
        let mut entry = SecurityEntry::new(SecurityEvent::Blocked, "198.51.100.1").with_user("");
        entry.time = Utc.with_ymd_and_hms(2024, 3, 2, 11, 0, 5).unwrap();

        assert_eq!(entry.to_line(), "2024-03-02T11:00:05Z [BLOCKED] IP=198.51.100.1");
    }
}
