//! Lumo Logs Library
//!
//! Multi-channel structured logging and an append-only audit store for the
//! Lumo control panel. Six channels (access, server, error, debug,
//! security, audit) each own one file in a shared log directory and are
//! created together by [`manager::LogManager`].

pub mod access;
pub mod audit;
pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod manager;
pub mod security;
