//! Detail sanitization for audit logging.
//!
//! Redacts sensitive values and truncates oversized payloads before an
//! entry's details reach the audit file.

use crate::channel::{FieldValue, Fields};

/// Key fragments whose values are never written.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "credential",
    "private_key",
    "api_key",
    "authorization",
    "cookie",
];

/// Sensitive only as a whole `_`-separated key segment.
const SENSITIVE_SEGMENTS: &[&str] = &["otp"];

pub(crate) const REDACTED: &str = "[REDACTED]";

/// Maximum length for string values before truncation.
const MAX_STRING_LENGTH: usize = 1024;

/// Whether values stored under `key` must never be written.
pub fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|s| key_lower.contains(s))
        || key_lower
            .split('_')
            .any(|segment| SENSITIVE_SEGMENTS.contains(&segment))
}

/// Sanitize audit details in place.
///
/// Values of keys containing a sensitive fragment (case-insensitive)
/// become `[REDACTED]`; any other string longer than the limit is
/// replaced with a `[TRUNCATED - N bytes]` marker. Nested lists and maps
/// are sanitized the same way, and non-finite floats become `null`.
pub fn sanitize_details(details: &mut Fields) {
    details.normalize();
    for (key, value) in details.iter_mut() {
        sanitize_entry(key, value);
    }
}

fn sanitize_entry(key: &str, value: &mut FieldValue) {
    if is_sensitive_key(key) {
        *value = FieldValue::Str(REDACTED.to_string());
        return;
    }
    sanitize_value(value);
}

fn sanitize_value(value: &mut FieldValue) {
    let oversized = match value {
        FieldValue::Str(s) if s.len() > MAX_STRING_LENGTH => Some(s.len()),
        _ => None,
    };
    if let Some(len) = oversized {
        *value = FieldValue::Str(format!("[TRUNCATED - {} bytes]", len));
        return;
    }
    match value {
        FieldValue::List(items) => items.iter_mut().for_each(sanitize_value),
        FieldValue::Map(map) => {
            for (key, value) in map.iter_mut() {
                sanitize_entry(key, value);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_password() {
        let mut details = Fields::new()
            .with("username", "admin")
            .with("password", "super_secret_123");
        sanitize_details(&mut details);

        assert_eq!(details.get("username").and_then(|v| v.as_str()), Some("admin"));
        assert_eq!(details.get("password").and_then(|v| v.as_str()), Some(REDACTED));
    }

    #[test]
    fn test_sanitize_case_insensitive_fragments() {
        let mut details = Fields::new()
            .with("API_KEY", "k")
            .with("Refresh_Token", "t")
            .with("otp_code", 123456)
            .with("session_cookie", "c");
        sanitize_details(&mut details);

        for (_, value) in details.iter() {
            assert_eq!(value.as_str(), Some(REDACTED));
        }
    }

    #[test]
    fn test_otp_matches_whole_segment_only() {
        assert!(is_sensitive_key("otp"));
        assert!(is_sensitive_key("OTP_Code"));
        assert!(is_sensitive_key("backup_otp"));
        assert!(!is_sensitive_key("footprint"));
        assert!(!is_sensitive_key("hotpath"));
    }

    #[test]
    fn test_nested_details_are_sanitized() {
        let inner = Fields::new()
            .with("api_key", "k")
            .with("blob", "y".repeat(1500))
            .with("region", "eu");
        let mut details = Fields::new()
            .with("request", inner)
            .with("score", FieldValue::Float(f64::NAN));
        sanitize_details(&mut details);

        let expected = Fields::new()
            .with("api_key", REDACTED)
            .with("blob", "[TRUNCATED - 1500 bytes]")
            .with("region", "eu");
        assert_eq!(details.get("request"), Some(&FieldValue::from(expected)));
        assert_eq!(details.get("score"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_truncate_large_strings() {
        let mut details = Fields::new()
            .with("payload", "x".repeat(2000))
            .with("note", "short");
        sanitize_details(&mut details);

        assert_eq!(
            details.get("payload").and_then(|v| v.as_str()),
            Some("[TRUNCATED - 2000 bytes]")
        );
        assert_eq!(details.get("note").and_then(|v| v.as_str()), Some("short"));
    }

    #[test]
    fn test_non_string_values_preserved() {
        let mut details = Fields::new().with("attempts", 5).with("locked", true);
        sanitize_details(&mut details);
        assert_eq!(details, Fields::new().with("attempts", 5).with("locked", true));
    }
}
