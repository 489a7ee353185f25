//! Shared channel plumbing.
//!
//! Every log channel owns one [`ChannelFile`] behind its own mutex. The
//! file type implements the rotation protocol used identically by all
//! channels, and [`WriteErrorSink`] makes dropped writes observable.
//!
//! ## Channels
//!
//! | Channel  | File           |
//! |----------|----------------|
//! | access   | `access.log`   |
//! | server   | `server.log`   |
//! | error    | `error.log`    |
//! | debug    | `debug.log`    |
//! | security | `security.log` |
//! | audit    | `audit.log`    |

mod fields;
mod file;
mod sink;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use fields::{FieldValue, Fields};
pub use file::{rotated_name, ChannelFile};
pub use sink::{ErrorCallback, WriteErrorSink};

/// Identifies one of the six log channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Access,
    Server,
    Error,
    Debug,
    Security,
    Audit,
}

impl Channel {
    /// All channels in manager construction order.
    pub const ALL: [Channel; 6] = [
        Channel::Access,
        Channel::Server,
        Channel::Error,
        Channel::Debug,
        Channel::Security,
        Channel::Audit,
    ];

    /// Short name of the channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Server => "server",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Security => "security",
            Self::Audit => "audit",
        }
    }

    /// Deterministic file name inside the log directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Access => "access.log",
            Self::Server => "server.log",
            Self::Error => "error.log",
            Self::Debug => "debug.log",
            Self::Security => "security.log",
            Self::Audit => "audit.log",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
