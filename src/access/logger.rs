//! Access logger for writing one line per completed request.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::channel::{Channel, ChannelFile, ErrorCallback, WriteErrorSink};
use crate::error::{LogError, LogResult};

use super::entry::{AccessEntry, AccessFormat};
use super::format::FormatRegistry;
use super::template::{
    render_combined, render_common, render_template, variable_values, ServerIdentity,
};

struct AccessState {
    file: ChannelFile,
    format: AccessFormat,
    template: Option<String>,
}

/// Logger for the access channel.
///
/// Thread-safe via internal mutex; the mutex guards the file handle and
/// the selected format together.
pub struct AccessLogger {
    state: Mutex<AccessState>,
    registry: FormatRegistry,
    identity: ServerIdentity,
    errors: WriteErrorSink,
}

impl AccessLogger {
    /// Create an access logger writing to `path`.
    ///
    /// A `Custom` format without a template falls back to `Combined`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for appending.
    pub fn new(
        path: &Path,
        format: AccessFormat,
        template: Option<String>,
        registry: FormatRegistry,
    ) -> LogResult<Self> {
        let file = ChannelFile::open(Channel::Access, path)?;
        let (format, template) = resolve_format(format, template);

        Ok(Self {
            state: Mutex::new(AccessState {
                file,
                format,
                template,
            }),
            registry,
            identity: ServerIdentity::current(),
            errors: WriteErrorSink::new(Channel::Access),
        })
    }

    /// Override the values of `$hostname` and `$pid`.
    pub fn with_identity(mut self, identity: ServerIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Change the output format.
    pub fn set_format(&self, format: AccessFormat, template: Option<String>) {
        let (format, template) = resolve_format(format, template);
        match self.lock() {
            Ok(mut state) => {
                state.format = format;
                state.template = template;
            }
            Err(e) => self.errors.report(e),
        }
    }

    /// The format currently in effect.
    pub fn format(&self) -> AccessFormat {
        self.lock()
            .map(|state| state.format)
            .unwrap_or_default()
    }

    /// Return the `$name` tokens of `template` the registry does not know.
    pub fn validate_format(&self, template: &str) -> Vec<String> {
        self.registry.validate(template)
    }

    /// The token registry used for custom templates.
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Append one entry.
    ///
    /// Write failures are counted and reported to the error sink; they
    /// are never returned to the caller.
    pub fn log(&self, entry: &AccessEntry) {
        if let Err(e) = self.try_log(entry) {
            self.errors.report(e);
        }
    }

    fn try_log(&self, entry: &AccessEntry) -> LogResult<()> {
        let mut state = self.lock()?;
        let line = match (state.format, state.template.as_deref()) {
            (AccessFormat::Common, _) => render_common(entry),
            (AccessFormat::Json, _) => serde_json::to_string(entry)?,
            (AccessFormat::Custom, Some(template)) => render_template(
                template,
                &self.registry,
                &variable_values(entry, &self.identity),
            ),
            _ => render_combined(entry),
        };
        state.file.append_line(&line)
    }

    /// Rotate the access log file.
    pub fn rotate(&self) -> LogResult<()> {
        self.lock()?.file.rotate().map(|_| ())
    }

    /// Close the access log file.
    pub fn close(&self) -> LogResult<()> {
        self.lock()?.file.close()
    }

    /// Number of entries dropped because of write failures.
    pub fn write_failures(&self) -> u64 {
        self.errors.failures()
    }

    /// Install a callback invoked for every dropped entry.
    pub fn on_write_error(&self, callback: ErrorCallback) {
        self.errors.set_callback(callback);
    }

    fn lock(&self) -> LogResult<MutexGuard<'_, AccessState>> {
        self.state.lock().map_err(|_| LogError::LockPoisoned {
            channel: Channel::Access,
        })
    }
}

fn resolve_format(
    format: AccessFormat,
    template: Option<String>,
) -> (AccessFormat, Option<String>) {
    let template = template.filter(|t| !t.trim().is_empty());
    if format == AccessFormat::Custom && template.is_none() {
        debug!("Custom access format without template; using combined");
        return (AccessFormat::Combined, None);
    }
    (format, template)
}
