//! Channel file handle and rotation protocol.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::error::{LogError, LogResult};

use super::Channel;

/// The single file handle owned by a channel.
///
/// The handle is `None` while the channel is closed (or, for the debug
/// channel, disabled). Callers serialize access through the owning
/// logger's mutex; nothing here locks.
pub struct ChannelFile {
    channel: Channel,
    path: PathBuf,
    file: Option<File>,
}

impl ChannelFile {
    /// Open (or create) the channel file in append mode.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn open(channel: Channel, path: &Path) -> LogResult<Self> {
        let mut this = Self::closed(channel, path);
        this.reopen()?;
        Ok(this)
    }

    /// Create a handle that is not yet backed by an open file.
    pub fn closed(channel: Channel, path: &Path) -> Self {
        Self {
            channel,
            path: path.to_path_buf(),
            file: None,
        }
    }

    /// Open the file if it is not open already.
    pub fn reopen(&mut self) -> LogResult<()> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!(path = %parent.display(), "Creating log directory");
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        debug!(channel = %self.channel, path = %self.path.display(), "Channel file opened");
        self.file = Some(file);
        Ok(())
    }

    /// The channel this file belongs to.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a file handle is currently held.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Append one record followed by a newline.
    ///
    /// The record and its terminator go out in a single write so concurrent
    /// readers never see a line without its newline.
    pub fn append_line(&mut self, line: &str) -> LogResult<()> {
        let file = self.file.as_mut().ok_or(LogError::Closed {
            channel: self.channel,
        })?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes())?;
        Ok(())
    }

    /// Flush written data to disk.
    pub fn sync(&mut self) -> LogResult<()> {
        if let Some(file) = self.file.as_mut() {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Flush and release the file handle. Closing twice is a no-op.
    ///
    /// When the flush fails the handle is kept, so the channel stays
    /// writable.
    pub fn close(&mut self) -> LogResult<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
            file.sync_data()?;
            self.file = None;
            debug!(channel = %self.channel, "Channel file closed");
        }
        Ok(())
    }

    /// Rotate the active file.
    ///
    /// Closes the handle, renames the file to `<name>.<YYYYMMDD>` (or a
    /// date-time suffix when that name is taken) and reopens a fresh file
    /// at the original path. Returns the rotated path, or `None` when the
    /// channel was not open.
    pub fn rotate(&mut self) -> LogResult<Option<PathBuf>> {
        let Some(file) = self.file.take() else {
            return Ok(None);
        };

        if let Err(e) = file.sync_data() {
            warn!(channel = %self.channel, error = %e, "Failed to sync before rotation");
        }
        drop(file);

        let target = rotation_target(&self.path, Local::now());
        let renamed = fs::rename(&self.path, &target);

        // The channel must come back even when the rename failed.
        self.reopen()?;
        renamed?;

        info!(
            channel = %self.channel,
            rotated = %target.display(),
            "Channel file rotated"
        );
        Ok(Some(target))
    }
}

impl Drop for ChannelFile {
    fn drop(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
    }
}

/// Name of a rotated file for the given suffix style.
///
/// `with_time` selects the collision form `<name>.<YYYYMMDD-HHMMSS>`.
pub fn rotated_name(path: &Path, now: DateTime<Local>, with_time: bool) -> PathBuf {
    let suffix = if with_time {
        now.format("%Y%m%d-%H%M%S").to_string()
    } else {
        now.format("%Y%m%d").to_string()
    };
    append_suffix(path, &suffix)
}

/// First free rotated name: date, then date-time, then date-time with a
/// counter for repeated rotations inside the same second.
fn rotation_target(path: &Path, now: DateTime<Local>) -> PathBuf {
    let dated = rotated_name(path, now, false);
    if !dated.exists() {
        return dated;
    }

    let timed = rotated_name(path, now, true);
    if !timed.exists() {
        return timed;
    }

    let base = now.format("%Y%m%d-%H%M%S").to_string();
    let mut n = 1u32;
    loop {
        let candidate = append_suffix(path, &format!("{}-{}", base, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
