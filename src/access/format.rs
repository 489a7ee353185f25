//! Registry of `$token` variables for custom access log templates.

use serde::Serialize;

/// A named substitution token usable in custom templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatVariable {
    /// Token name without the leading `$`.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Example rendered value.
    pub example: &'static str,
}

const fn var(
    name: &'static str,
    description: &'static str,
    example: &'static str,
) -> FormatVariable {
    FormatVariable {
        name,
        description,
        example,
    }
}

const STANDARD_VARIABLES: &[FormatVariable] = &[
    var("remote_addr", "Client IP address", "203.0.113.7"),
    var("remote_user", "Authenticated user name", "alice"),
    var("time_local", "Request time, Common Log Format", "10/Oct/2024:13:55:36 +0200"),
    var("time_iso8601", "Request time, ISO 8601", "2024-10-10T11:55:36+00:00"),
    var("time_unix", "Request time, unix seconds", "1728561336"),
    var("time_unix_ms", "Request time, unix milliseconds", "1728561336123"),
    var("request", "Full request line", "GET /index.html?page=2 HTTP/1.1"),
    var("request_method", "Request method", "GET"),
    var("request_uri", "Path with query string", "/index.html?page=2"),
    var("uri", "Request path", "/index.html"),
    var("args", "Query string", "page=2"),
    var("server_protocol", "Request protocol", "HTTP/1.1"),
    var("status", "Response status code", "200"),
    var("body_bytes_sent", "Response body size in bytes", "5120"),
    var("bytes_sent", "Total bytes sent to the client", "5367"),
    var("http_referer", "Referer header", "https://example.com/"),
    var("http_user_agent", "User-Agent header", "curl/8.4.0"),
    var("http_host", "Host header", "example.com"),
    var("http_x_forwarded_for", "X-Forwarded-For header", "203.0.113.7, 10.0.0.2"),
    var("http_x_forwarded_proto", "X-Forwarded-Proto header", "https"),
    var("request_time", "Request latency in seconds", "0.042"),
    var("request_time_ms", "Request latency in milliseconds", "42"),
    var("request_id", "Request identifier", "01HF7Z3K9Q0000000000000000"),
    var("connection", "Connection serial number", "1832"),
    var("connection_requests", "Requests served on this connection", "3"),
    var("ssl_protocol", "Negotiated TLS version", "TLS 1.3"),
    var("ssl_cipher", "Negotiated cipher suite", "TLS_AES_128_GCM_SHA256"),
    var("hostname", "Server host name", "web-01"),
    var("pid", "Server process ID", "4211"),
];

/// Catalogue of template tokens, in declaration order.
///
/// A token is the whole identifier after `$`, so `$request_time_ms` is
/// never consumed as `$request` + `_time_ms`.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    variables: Vec<FormatVariable>,
}

impl FormatRegistry {
    /// Registry containing the standard token vocabulary.
    pub fn standard() -> Self {
        Self::from_variables(STANDARD_VARIABLES.to_vec())
    }

    /// Build a registry from an explicit variable list.
    pub fn from_variables(variables: Vec<FormatVariable>) -> Self {
        Self { variables }
    }

    /// All variables in declaration order.
    pub fn variables(&self) -> &[FormatVariable] {
        &self.variables
    }

    /// Look up a variable by name (without `$`).
    pub fn get(&self, name: &str) -> Option<&FormatVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Whether the registry knows this token name.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Return every `$name` in `template` that is not a registered token.
    ///
    /// Names are reported with their `$` prefix, once each, in order of
    /// first appearance. An empty result means the template is valid.
    pub fn validate(&self, template: &str) -> Vec<String> {
        let mut unknown: Vec<String> = Vec::new();
        for name in token_names(template) {
            if !self.contains(name) {
                let token = format!("${}", name);
                if !unknown.contains(&token) {
                    unknown.push(token);
                }
            }
        }
        unknown
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// The identifier (`[A-Za-z0-9_]+`) at the start of `rest`, possibly empty.
pub(crate) fn leading_token(rest: &str) -> &str {
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Iterate over the identifier following each `$` in the template.
fn token_names(template: &str) -> impl Iterator<Item = &str> {
    template.match_indices('$').filter_map(move |(idx, _)| {
        let name = leading_token(&template[idx + 1..]);
        (!name.is_empty()).then_some(name)
    })
}
