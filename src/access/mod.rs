//! Access channel.
//!
//! Records one line per completed HTTP request in one of four layouts:
//!
//! - `combined`: `ip - user [time] "METHOD uri proto" status size "referer" "agent"`
//! - `common`: the same without referer and user agent
//! - `json`: the full [`AccessEntry`] as one JSON object
//! - `custom`: an operator template built from `$token` placeholders
//!
//! The token vocabulary lives in [`FormatRegistry`]; templates can be
//! checked at configuration time with [`FormatRegistry::validate`].

mod entry;
mod format;
mod logger;
mod request;
mod template;

pub use entry::{AccessEntry, AccessFormat};
pub use format::{FormatRegistry, FormatVariable};
pub use logger::AccessLogger;
pub use request::{
    cipher_suite_name, client_ip, strip_port, tls_version_name, RequestInfo, ResponseInfo, TlsInfo,
};
pub use template::{render_combined, render_common, render_template, variable_values, ServerIdentity};
