//! Server, error and debug channels.
//!
//! Each channel owns its file behind a mutex, filters on a [`Level`] floor
//! and writes either a single-line text layout or one JSON object per line.

mod debug;
mod entry;
mod error;
mod level;
mod server;

pub use debug::DebugLogger;
pub use entry::{DebugEntry, ErrorEntry, ServerEntry};
pub use error::ErrorLogger;
pub use level::{Level, LineFormat};
pub use server::ServerLogger;
