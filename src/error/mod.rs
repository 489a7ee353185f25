//! Error types for the Lumo log subsystem.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
