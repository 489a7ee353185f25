//! Security logger.

use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::channel::{Channel, ChannelFile, ErrorCallback, WriteErrorSink};
use crate::error::{LogError, LogResult};

use super::event::{SecurityEntry, SecurityEvent};

struct SecurityState {
    file: ChannelFile,
    console: bool,
}

/// Append-only security log.
///
/// Every line is mirrored to stderr as `[SECURITY] <line>` unless the
/// console mirror is turned off, so tail-based intrusion detection can
/// follow either stream.
pub struct SecurityLogger {
    state: Mutex<SecurityState>,
    errors: WriteErrorSink,
}

impl SecurityLogger {
    pub fn new(path: &Path, console: bool) -> LogResult<Self> {
        let file = ChannelFile::open(Channel::Security, path)?;
        Ok(Self {
            state: Mutex::new(SecurityState { file, console }),
            errors: WriteErrorSink::new(Channel::Security),
        })
    }

    pub fn set_console(&self, console: bool) {
        if let Ok(mut state) = self.lock() {
            state.console = console;
        }
    }

    /// Write one security entry.
    pub fn log(&self, entry: &SecurityEntry) {
        if let Err(e) = self.try_log(entry) {
            self.errors.report(e);
        }
    }

    fn try_log(&self, entry: &SecurityEntry) -> LogResult<()> {
        let line = entry.to_line();
        let mut state = self.lock()?;
        if state.console {
            let _ = writeln!(std::io::stderr().lock(), "[SECURITY] {}", line);
        }
        state.file.append_line(&line)
    }

    pub fn login_failed(&self, ip: &str, user: &str, reason: &str) {
        self.log(
            &SecurityEntry::new(SecurityEvent::LoginFailed, ip)
                .with_user(user)
                .with_details(reason),
        );
    }

    pub fn login_success(&self, ip: &str, user: &str) {
        self.log(&SecurityEntry::new(SecurityEvent::LoginSuccess, ip).with_user(user));
    }

    pub fn rate_limited(&self, ip: &str, path: &str) {
        self.log(&SecurityEntry::new(SecurityEvent::RateLimited, ip).with_path(path));
    }

    pub fn blocked(&self, ip: &str, reason: &str) {
        self.log(&SecurityEntry::new(SecurityEvent::Blocked, ip).with_details(reason));
    }

    pub fn suspicious(&self, ip: &str, path: &str, details: &str) {
        self.log(
            &SecurityEntry::new(SecurityEvent::Suspicious, ip)
                .with_path(path)
                .with_details(details),
        );
    }

    pub fn brute_force(&self, ip: &str, user: &str, attempts: u32) {
        self.log(
            &SecurityEntry::new(SecurityEvent::BruteForce, ip)
                .with_user(user)
                .with_details(format!("{} failed attempts", attempts)),
        );
    }

    pub fn invalid_token(&self, ip: &str, path: &str) {
        self.log(&SecurityEntry::new(SecurityEvent::InvalidToken, ip).with_path(path));
    }

    pub fn csrf_violation(&self, ip: &str, path: &str) {
        self.log(&SecurityEntry::new(SecurityEvent::CsrfViolation, ip).with_path(path));
    }

    pub fn rotate(&self) -> LogResult<()> {
        self.lock()?.file.rotate().map(|_| ())
    }

    pub fn close(&self) -> LogResult<()> {
        self.lock()?.file.close()
    }

    pub fn write_failures(&self) -> u64 {
        self.errors.failures()
    }

    pub fn on_write_error(&self, callback: ErrorCallback) {
        self.errors.set_callback(callback);
    }

    fn lock(&self) -> LogResult<MutexGuard<'_, SecurityState>> {
        self.state.lock().map_err(|_| LogError::LockPoisoned {
            channel: Channel::Security,
        })
    }
}
