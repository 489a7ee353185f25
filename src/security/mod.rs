//! Security channel.
//!
//! A fixed single-line grammar for authentication and abuse events, kept
//! separate from the audit store so external tooling can tail it.

mod event;
mod logger;

pub use event::{SecurityEntry, SecurityEvent};
pub use logger::SecurityLogger;
