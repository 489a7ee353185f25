//! Building access entries from request metadata supplied by the HTTP server.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chrono::Utc;

use super::entry::AccessEntry;

/// Negotiated TLS parameters of an encrypted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsInfo {
    /// Protocol version as it appears on the wire (e.g. `0x0304`).
    pub version: u16,
    /// IANA cipher suite identifier.
    pub cipher_suite: u16,
}

/// Inbound request metadata.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub query: String,
    pub proto_major: u8,
    pub proto_minor: u8,
    /// Transport-level peer address, usually `ip:port`.
    pub peer_addr: String,
    /// Request headers; names are matched case-insensitively.
    pub headers: Vec<(String, String)>,
    pub tls: Option<TlsInfo>,
    pub request_id: Option<String>,
    pub remote_user: Option<String>,
    pub connection_id: Option<u64>,
    pub connection_requests: Option<u64>,
}

impl RequestInfo {
    /// First value of a header, if present and non-empty.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Outcome of the request as observed by the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseInfo {
    pub status: u16,
    pub body_size: u64,
    pub bytes_sent: u64,
    pub latency: Duration,
}

impl AccessEntry {
    /// Derive an access entry from a completed request.
    pub fn from_request(req: &RequestInfo, resp: &ResponseInfo) -> Self {
        let header = |name: &str| req.header(name).map(str::to_string);

        Self {
            timestamp: Utc::now(),
            client_ip: client_ip(req),
            method: req.method.clone(),
            path: req.path.clone(),
            query: req.query.clone(),
            protocol: format!("HTTP/{}.{}", req.proto_major, req.proto_minor),
            status: resp.status,
            body_size: resp.body_size,
            bytes_sent: resp.bytes_sent,
            referer: header("Referer").unwrap_or_default(),
            user_agent: header("User-Agent").unwrap_or_default(),
            latency_us: u64::try_from(resp.latency.as_micros()).unwrap_or(u64::MAX),
            request_id: req.request_id.clone().or_else(|| header("X-Request-Id")),
            remote_user: req.remote_user.clone(),
            host: header("Host"),
            forwarded_for: header("X-Forwarded-For"),
            forwarded_proto: header("X-Forwarded-Proto"),
            tls_protocol: req.tls.map(|t| tls_version_name(t.version)),
            tls_cipher: req.tls.map(|t| cipher_suite_name(t.cipher_suite)),
            connection_id: req.connection_id,
            connection_requests: req.connection_requests,
        }
    }
}

/// Resolve the client address.
///
/// Precedence: `X-Real-IP`, then the first `X-Forwarded-For` hop, then the
/// transport peer address. Any trailing port is removed.
pub fn client_ip(req: &RequestInfo) -> String {
    if let Some(real_ip) = req.header("X-Real-IP") {
        return strip_port(real_ip).to_string();
    }

    if let Some(first) = req
        .header("X-Forwarded-For")
        .and_then(|v| v.split(',').map(str::trim).find(|s| !s.is_empty()))
    {
        return strip_port(first).to_string();
    }

    strip_port(&req.peer_addr).to_string()
}

/// Remove a trailing `:port` from an address.
///
/// Bare IPv6 literals are returned untouched; the bracketed form
/// `[addr]:port` yields `addr`.
pub fn strip_port(addr: &str) -> &str {
    let addr = addr.trim();

    if addr.parse::<IpAddr>().is_ok() {
        return addr;
    }

    if let Some(inner) = addr.strip_prefix('[') {
        return match inner.find(']') {
            Some(end) => &inner[..end],
            None => addr,
        };
    }

    if addr.parse::<SocketAddr>().is_ok() || addr.matches(':').count() == 1 {
        if let Some((host, _port)) = addr.rsplit_once(':') {
            return host;
        }
    }

    addr
}

/// Human-readable TLS protocol version.
pub fn tls_version_name(version: u16) -> String {
    match version {
        0x0300 => "SSL 3.0".to_string(),
        0x0301 => "TLS 1.0".to_string(),
        0x0302 => "TLS 1.1".to_string(),
        0x0303 => "TLS 1.2".to_string(),
        0x0304 => "TLS 1.3".to_string(),
        other => format!("0x{:04x}", other),
    }
}

/// IANA name of a cipher suite; unknown suites render as hex.
pub fn cipher_suite_name(id: u16) -> String {
    let name = match id {
        0x002f => "TLS_RSA_WITH_AES_128_CBC_SHA",
        0x0035 => "TLS_RSA_WITH_AES_256_CBC_SHA",
        0x009c => "TLS_RSA_WITH_AES_128_GCM_SHA256",
        0x009d => "TLS_RSA_WITH_AES_256_GCM_SHA384",
        0x1301 => "TLS_AES_128_GCM_SHA256",
        0x1302 => "TLS_AES_256_GCM_SHA384",
        0x1303 => "TLS_CHACHA20_POLY1305_SHA256",
        0xc009 => "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
        0xc00a => "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
        0xc013 => "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        0xc014 => "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        0xc02b => "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        0xc02c => "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        0xc02f => "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        0xc030 => "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        0xcca8 => "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
        0xcca9 => "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        other => return format!("0x{:04x}", other),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(peer: &str, headers: &[(&str, &str)]) -> RequestInfo {
        RequestInfo {
            method: "GET".to_string(),
            path: "/".to_string(),
            proto_major: 1,
            proto_minor: 1,
            peer_addr: peer.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_ip_prefers_real_ip() {
        let req = request(
            "10.0.0.2:5000",
            &[("X-Forwarded-For", "198.51.100.1"), ("x-real-ip", "203.0.113.9")],
        );
        assert_eq!(client_ip(&req), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_uses_first_forwarded_hop() {
        let req = request(
            "10.0.0.2:5000",
            &[("X-Forwarded-For", " 198.51.100.1 , 10.0.0.1")],
        );
        assert_eq!(client_ip(&req), "198.51.100.1");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let req = request("192.0.2.10:41234", &[]);
        assert_eq!(client_ip(&req), "192.0.2.10");
    }

    #[test]
    fn test_strip_port_ipv6() {
        assert_eq!(strip_port("[2001:db8::1]:8443"), "2001:db8::1");
        assert_eq!(strip_port("[2001:db8::1]"), "2001:db8::1");
        assert_eq!(strip_port("2001:db8::1"), "2001:db8::1");
        assert_eq!(strip_port("::1"), "::1");
    }

    #[test]
    fn test_strip_port_ipv4_and_names() {
        assert_eq!(strip_port("192.0.2.10:80"), "192.0.2.10");
        assert_eq!(strip_port("192.0.2.10"), "192.0.2.10");
        assert_eq!(strip_port("localhost:8080"), "localhost");
    }

    #[test]
    fn test_tls_names() {
        assert_eq!(tls_version_name(0x0304), "TLS 1.3");
        assert_eq!(tls_version_name(0x7f1c), "0x7f1c");
        assert_eq!(cipher_suite_name(0x1301), "TLS_AES_128_GCM_SHA256");
        assert_eq!(cipher_suite_name(0xabcd), "0xabcd");
    }

    #[test]
    fn test_from_request() {
        let mut req = request(
            "[2001:db8::7]:55000",
            &[
                ("User-Agent", "curl/8.4.0"),
                ("Referer", "https://example.com/"),
                ("Host", "example.com"),
                ("X-Request-Id", "req-42"),
            ],
        );
        req.proto_major = 2;
        req.proto_minor = 0;
        req.query = "a=1".to_string();
        req.tls = Some(TlsInfo {
            version: 0x0303,
            cipher_suite: 0xc02f,
        });

        let resp = ResponseInfo {
            status: 404,
            body_size: 12,
            bytes_sent: 200,
            latency: Duration::from_millis(7),
        };

        let entry = AccessEntry::from_request(&req, &resp);
        assert_eq!(entry.client_ip, "2001:db8::7");
        assert_eq!(entry.protocol, "HTTP/2.0");
        assert_eq!(entry.status, 404);
        assert_eq!(entry.latency_us, 7_000);
        assert_eq!(entry.user_agent, "curl/8.4.0");
        assert_eq!(entry.host.as_deref(), Some("example.com"));
        assert_eq!(entry.request_id.as_deref(), Some("req-42"));
        assert_eq!(entry.tls_protocol.as_deref(), Some("TLS 1.2"));
        assert_eq!(
            entry.tls_cipher.as_deref(),
            Some("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256")
        );
    }
}
