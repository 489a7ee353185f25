//! Rendering of access entries into fixed and custom text layouts.

use std::collections::HashMap;

use chrono::{Local, SecondsFormat};

use super::entry::{dash, AccessEntry};
use super::format::{leading_token, FormatRegistry};

/// Common Log Format timestamp layout.
const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Host facts exposed through `$hostname` and `$pid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub hostname: String,
    pub pid: u32,
}

impl ServerIdentity {
    /// Identity of the running process.
    pub fn current() -> Self {
        let hostname = nix::unistd::gethostname()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_default();
        Self {
            hostname,
            pid: std::process::id(),
        }
    }
}

/// Apache combined layout.
pub fn render_combined(entry: &AccessEntry) -> String {
    format!(
        "{} \"{}\" \"{}\"",
        render_common(entry),
        dash(&entry.referer),
        dash(&entry.user_agent)
    )
}

/// Apache common layout.
pub fn render_common(entry: &AccessEntry) -> String {
    format!(
        "{} - {} [{}] \"{}\" {} {}",
        dash(&entry.client_ip),
        dash(entry.remote_user.as_deref().unwrap_or("")),
        entry.timestamp.with_timezone(&Local).format(CLF_TIME),
        entry.request_line(),
        entry.status,
        entry.body_size
    )
}

/// Build the rendered value of every standard token for one entry.
///
/// Empty text renders as `-`; numbers render as decimal strings.
pub fn variable_values(
    entry: &AccessEntry,
    identity: &ServerIdentity,
) -> HashMap<&'static str, String> {
    let text = |s: &str| dash(s).to_string();
    let opt_text = |s: &Option<String>| dash(s.as_deref().unwrap_or("")).to_string();
    let opt_num = |n: Option<u64>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
    let local = entry.timestamp.with_timezone(&Local);

    HashMap::from([
        ("remote_addr", text(&entry.client_ip)),
        ("remote_user", opt_text(&entry.remote_user)),
        ("time_local", local.format(CLF_TIME).to_string()),
        (
            "time_iso8601",
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        ),
        ("time_unix", entry.timestamp.timestamp().to_string()),
        ("time_unix_ms", entry.timestamp.timestamp_millis().to_string()),
        ("request", entry.request_line()),
        ("request_method", text(&entry.method)),
        ("request_uri", text(&entry.request_uri())),
        ("uri", text(&entry.path)),
        ("args", text(&entry.query)),
        ("server_protocol", text(&entry.protocol)),
        ("status", entry.status.to_string()),
        ("body_bytes_sent", entry.body_size.to_string()),
        ("bytes_sent", entry.bytes_sent.to_string()),
        ("http_referer", text(&entry.referer)),
        ("http_user_agent", text(&entry.user_agent)),
        ("http_host", opt_text(&entry.host)),
        ("http_x_forwarded_for", opt_text(&entry.forwarded_for)),
        ("http_x_forwarded_proto", opt_text(&entry.forwarded_proto)),
        (
            "request_time",
            format!("{:.3}", entry.latency_us as f64 / 1_000_000.0),
        ),
        ("request_time_ms", (entry.latency_us / 1_000).to_string()),
        ("request_id", opt_text(&entry.request_id)),
        ("connection", opt_num(entry.connection_id)),
        ("connection_requests", opt_num(entry.connection_requests)),
        ("ssl_protocol", opt_text(&entry.tls_protocol)),
        ("ssl_cipher", opt_text(&entry.tls_cipher)),
        ("hostname", text(&identity.hostname)),
        ("pid", identity.pid.to_string()),
    ])
}

/// Substitute `$token` placeholders in `template`.
///
/// The token is the whole identifier after each `$`, the same one
/// [`FormatRegistry::validate`] reads. Substituted values are emitted as-is
/// and never re-scanned. Unknown tokens are left verbatim.
pub fn render_template(
    template: &str,
    registry: &FormatRegistry,
    values: &HashMap<&'static str, String>,
) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];

        let name = leading_token(after);

        match values.get(name).filter(|_| registry.contains(name)) {
            Some(value) => {
                out.push_str(value);
                rest = &after[name.len()..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
