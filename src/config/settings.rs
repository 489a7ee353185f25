//! Configuration settings for the Lumo log subsystem.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::warn;

use crate::access::{AccessFormat, FormatRegistry};
use crate::audit::{AuditOptions, RetentionPolicy, DEFAULT_ID_PREFIX};
use crate::diagnostics::{Level, LineFormat};
use crate::error::{LogError, LogResult};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub error: ErrorConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Diagnostics of the subsystem itself (tracing).
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Location of the channel files.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    /// Directory holding every channel file.
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,
}

/// Access channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// One of combined, common, json, custom.
    #[serde(default = "default_access_format")]
    pub format: String,
    /// `$token` template used by the custom format.
    #[serde(default)]
    pub template: Option<String>,
}

/// Server channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json".
    #[serde(default = "default_line_format")]
    pub format: String,
    /// Mirror entries to stdout.
    #[serde(default = "default_true")]
    pub console: bool,
}

/// Error channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorConfig {
    #[serde(default = "default_error_level")]
    pub level: String,
    #[serde(default = "default_line_format")]
    pub format: String,
}

/// Debug channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DebugConfig {
    /// Open the debug file at startup.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_debug_level")]
    pub level: String,
    #[serde(default = "default_line_format")]
    pub format: String,
}

/// Security channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Mirror entries to stderr with a `[SECURITY]` prefix.
    #[serde(default = "default_true")]
    pub console: bool,
}

/// Audit channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Mirror a summary of each entry to stdout.
    #[serde(default)]
    pub console: bool,
    /// Cluster node id stamped on entries.
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

/// Audit retention policy applied by `cleanup`.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Zero disables the age limit.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
    /// Zero disables the entry cap.
    #[serde(default)]
    pub max_entries: usize,
    #[serde(default = "default_true")]
    pub preserve_critical: bool,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/lumo")
}

fn default_access_format() -> String {
    "combined".to_string()
}

fn default_line_format() -> String {
    "text".to_string()
}

fn default_error_level() -> String {
    "warn".to_string()
}

fn default_debug_level() -> String {
    "debug".to_string()
}

fn default_true() -> bool {
    true
}

fn default_id_prefix() -> String {
    DEFAULT_ID_PREFIX.to_string()
}

fn default_max_age_days() -> u64 {
    365
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            format: default_access_format(),
            template: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_line_format(),
            console: default_true(),
        }
    }
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            level: default_error_level(),
            format: default_line_format(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: default_debug_level(),
            format: default_line_format(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            console: default_true(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            console: false,
            node_id: None,
            id_prefix: default_id_prefix(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            max_entries: 0,
            preserve_critical: default_true(),
        }
    }
}

fn parse_field<T: FromStr<Err = String>>(section: &str, value: &str) -> LogResult<T> {
    value.parse().map_err(|e: String| LogError::Config {
        message: format!("[{}] {}", section, e),
    })
}

impl ServerConfig {
    pub fn level(&self) -> LogResult<Level> {
        parse_field("server", &self.level)
    }

    pub fn line_format(&self) -> LogResult<LineFormat> {
        parse_field("server", &self.format)
    }
}

impl ErrorConfig {
    pub fn level(&self) -> LogResult<Level> {
        parse_field("error", &self.level)
    }

    pub fn line_format(&self) -> LogResult<LineFormat> {
        parse_field("error", &self.format)
    }
}

impl DebugConfig {
    pub fn level(&self) -> LogResult<Level> {
        parse_field("debug", &self.level)
    }

    pub fn line_format(&self) -> LogResult<LineFormat> {
        parse_field("debug", &self.format)
    }
}

impl AccessConfig {
    /// The configured format, falling back to combined with a warning.
    pub fn access_format(&self) -> AccessFormat {
        AccessFormat::parse_or_default(&self.format)
    }
}

impl AuditConfig {
    pub fn options(&self) -> AuditOptions {
        AuditOptions {
            console: self.console,
            node_id: self.node_id.clone(),
            id_prefix: self.id_prefix.clone(),
        }
    }
}

impl RetentionConfig {
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::from_days(self.max_age_days, self.max_entries, self.preserve_critical)
    }
}

impl LogSettings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> LogResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LogError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings = Self::from_toml(&content).map_err(|e| LogError::Config {
            message: format!("Failed to load config file '{}': {}", path.display(), e),
        })?;

        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> LogResult<Self> {
        let settings: LogSettings = toml::from_str(content).map_err(|e| LogError::Config {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    ///
    /// Bad levels, line formats or an empty directory are errors. Access
    /// format problems only warn: they fall back to combined or leave
    /// unknown tokens unresolved.
    pub fn validate(&self) -> LogResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(LogError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(LogError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if self.logs.directory.as_os_str().is_empty() {
            return Err(LogError::Config {
                message: "[logs] directory must not be empty".to_string(),
            });
        }

        self.server.level()?;
        self.server.line_format()?;
        self.error.level()?;
        self.error.line_format()?;
        self.debug.level()?;
        self.debug.line_format()?;

        for warning in self.access_warnings(&FormatRegistry::standard()) {
            warn!("{}", warning);
        }

        Ok(())
    }

    /// Non-fatal problems with the access channel configuration.
    pub fn access_warnings(&self, registry: &FormatRegistry) -> Vec<String> {
        let mut warnings = Vec::new();
        let format = match self.access.format.parse::<AccessFormat>() {
            Ok(format) => format,
            Err(_) => {
                warnings.push(format!(
                    "[access] unknown format '{}', using combined",
                    self.access.format
                ));
                return warnings;
            }
        };

        if format == AccessFormat::Custom {
            match self.access.template.as_deref().filter(|t| !t.is_empty()) {
                None => warnings.push(
                    "[access] custom format without template, using combined".to_string(),
                ),
                Some(template) => {
                    let unknown = registry.validate(template);
                    if !unknown.is_empty() {
                        warnings.push(format!(
                            "[access] template has unknown tokens: {}",
                            unknown.join(", ")
                        ));
                    }
                }
            }
        }
        warnings
    }
}
