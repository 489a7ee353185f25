//! Configuration module for the Lumo log subsystem.
//!
//! Handles loading and validating channel configuration from TOML files.

mod settings;

pub use settings::*;
