//! Construction and lifecycle of all six channels.
//!
//! [`LogManager`] owns one logger per channel, each bound to a fixed file
//! name inside a single directory. Aggregate operations visit every channel
//! and collect failures instead of stopping at the first one.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::access::{AccessLogger, FormatRegistry};
use crate::audit::AuditLogger;
use crate::channel::{Channel, ErrorCallback};
use crate::config::LogSettings;
use crate::diagnostics::{DebugLogger, ErrorLogger, ServerLogger};
use crate::error::{ChannelErrors, LogResult};
use crate::security::SecurityLogger;

/// Owner of every log channel.
pub struct LogManager {
    directory: PathBuf,
    access: AccessLogger,
    server: ServerLogger,
    error: ErrorLogger,
    debug: DebugLogger,
    security: SecurityLogger,
    audit: AuditLogger,
}

impl LogManager {
    /// Create the log directory if needed and open every channel.
    ///
    /// # Errors
    ///
    /// Returns an error if settings are invalid or the directory or a
    /// channel file cannot be created.
    pub fn new(settings: &LogSettings) -> LogResult<Self> {
        Self::with_registry(settings, FormatRegistry::standard())
    }

    /// Like [`LogManager::new`] with a caller-supplied token registry.
    pub fn with_registry(settings: &LogSettings, registry: FormatRegistry) -> LogResult<Self> {
        let directory = settings.logs.directory.clone();
        std::fs::create_dir_all(&directory)?;
        let path = |channel: Channel| directory.join(channel.file_name());

        let access = AccessLogger::new(
            &path(Channel::Access),
            settings.access.access_format(),
            settings.access.template.clone(),
            registry,
        )?;
        let server = ServerLogger::new(
            &path(Channel::Server),
            settings.server.level()?,
            settings.server.line_format()?,
            settings.server.console,
        )?;
        let error = ErrorLogger::new(
            &path(Channel::Error),
            settings.error.level()?,
            settings.error.line_format()?,
        )?;

        let debug = DebugLogger::new(&path(Channel::Debug), settings.debug.line_format()?);
        debug.set_level(settings.debug.level()?);
        if settings.debug.enabled {
            debug.enable()?;
        }

        let security = SecurityLogger::new(&path(Channel::Security), settings.security.console)?;
        let audit = AuditLogger::new(&path(Channel::Audit), settings.audit.options())?;

        info!(directory = %directory.display(), "Log channels opened");

        Ok(Self {
            directory,
            access,
            server,
            error,
            debug,
            security,
            audit,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn access(&self) -> &AccessLogger {
        &self.access
    }

    pub fn server(&self) -> &ServerLogger {
        &self.server
    }

    pub fn error(&self) -> &ErrorLogger {
        &self.error
    }

    pub fn debug(&self) -> &DebugLogger {
        &self.debug
    }

    pub fn security(&self) -> &SecurityLogger {
        &self.security
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Route write failures of every channel to `callback`.
    pub fn set_error_callback(&self, callback: ErrorCallback) {
        self.access.on_write_error(callback.clone());
        self.server.on_write_error(callback.clone());
        self.error.on_write_error(callback.clone());
        self.debug.on_write_error(callback.clone());
        self.security.on_write_error(callback.clone());
        self.audit.on_write_error(callback);
    }

    /// Total write failures across all channels.
    pub fn write_failures(&self) -> u64 {
        self.access.write_failures()
            + self.server.write_failures()
            + self.error.write_failures()
            + self.debug.write_failures()
            + self.security.write_failures()
            + self.audit.write_failures()
    }

    fn each(&self, op: &str, f: impl Fn(&Self, Channel) -> LogResult<()>) -> LogResult<()> {
        let mut errors = ChannelErrors::new();
        for channel in Channel::ALL {
            let result = f(self, channel);
            if let Err(ref e) = result {
                warn!(channel = %channel, error = %e, "Failed to {} channel", op);
            }
            errors.record(channel, result);
        }
        errors.into_result()
    }

    /// Rotate every channel. All channels are attempted even when some fail.
    pub fn rotate_all(&self) -> LogResult<()> {
        let result = self.each("rotate", |m, channel| match channel {
            Channel::Access => m.access.rotate(),
            Channel::Server => m.server.rotate(),
            Channel::Error => m.error.rotate(),
            Channel::Debug => m.debug.rotate(),
            Channel::Security => m.security.rotate(),
            Channel::Audit => m.audit.rotate(),
        });
        if result.is_ok() {
            info!(directory = %self.directory.display(), "Log channels rotated");
        }
        result
    }

    /// Close every channel. All channels are attempted even when some fail.
    pub fn close(&self) -> LogResult<()> {
        self.each("close", |m, channel| match channel {
            Channel::Access => m.access.close(),
            Channel::Server => m.server.close(),
            Channel::Error => m.error.close(),
            Channel::Debug => m.debug.close(),
            Channel::Security => m.security.close(),
            Channel::Audit => m.audit.close(),
        })
    }
}
