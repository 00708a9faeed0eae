//! # Collector Configuration
//!
//! Loaded once at startup, from a TOML file, the environment, or both:
//!
//! ```toml
//! log_dir = "/var/log/refcol"
//! sink = "file"            # or "tracing"
//! max_line_len = 256
//! concurrency = true
//! wait_strategy = "park"   # or "yield"
//! init_timeout_ms = 500
//! ```
//!
//! `INTEL_LIBITTNOTIFY_LOG_DIR` overrides `log_dir`. `REFCOL_CONFIG` names
//! the TOML file to read first.

use std::env::VarError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use refcol_core::{GateOptions, WaitStrategy, DEFAULT_MAX_LINE_LEN};
use serde::{Deserialize, Serialize};

use crate::error::{CollectorError, CollectorResult};

/// Directory for the log file.
pub const LOG_DIR_ENV: &str = "INTEL_LIBITTNOTIFY_LOG_DIR";

/// Path of a TOML config file.
pub const CONFIG_PATH_ENV: &str = "REFCOL_CONFIG";

/// Smallest accepted `max_line_len`.
pub const MIN_LINE_LEN: usize = 16;

/// Where events go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Append-per-line log file.
    #[default]
    File,
    /// Forward to `tracing`.
    Tracing,
}

/// Collector settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    /// Log file directory. Falls back to the platform temp location.
    pub log_dir: Option<PathBuf>,
    /// Event destination.
    pub sink: SinkKind,
    /// Bound on log lines and rendered metadata, in bytes.
    pub max_line_len: usize,
    /// Whether the host supports threads.
    pub concurrency: bool,
    /// How losers of the registry init race wait.
    pub wait_strategy: WaitStrategy,
    /// Maximum wait for a loser of the init race. `None` waits forever.
    pub init_timeout_ms: Option<u64>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            sink: SinkKind::File,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            concurrency: true,
            wait_strategy: WaitStrategy::Park,
            init_timeout_ms: None,
        }
    }
}

impl CollectorConfig {
    /// Events go to `tracing` instead of a file.
    #[must_use]
    pub fn tracing_only() -> Self {
        Self {
            sink: SinkKind::Tracing,
            ..Self::default()
        }
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// [`CollectorError::Config`] on a parse error or an invalid value.
    pub fn from_toml_str(text: &str) -> CollectorResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| CollectorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`CollectorError::Io`] if the file cannot be read, otherwise as
    /// [`CollectorConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> CollectorResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Builds the config from the process environment.
    ///
    /// # Errors
    ///
    /// As [`CollectorConfig::from_lookup`].
    pub fn from_env() -> CollectorResult<Self> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Builds the config from an environment lookup.
    ///
    /// # Errors
    ///
    /// [`CollectorError::Config`] if a variable is not valid unicode or the
    /// named config file is invalid, [`CollectorError::Io`] if it cannot be
    /// read.
    pub fn from_lookup<F>(lookup: F) -> CollectorResult<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let mut config = match read_var(&lookup, CONFIG_PATH_ENV)? {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(dir) = read_var(&lookup, LOG_DIR_ENV)? {
            config.log_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Defaults with only the log directory taken from `lookup`.
    ///
    /// The fallback when [`CollectorConfig::from_lookup`] fails: a bad
    /// config file must not move the log away from the directory the
    /// environment names.
    #[must_use]
    pub fn fallback_from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let mut config = Self::default();
        if let Ok(Some(dir)) = read_var(&lookup, LOG_DIR_ENV) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        config
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`CollectorError::Config`] naming the offending key.
    pub fn validate(&self) -> CollectorResult<()> {
        if self.max_line_len < MIN_LINE_LEN {
            return Err(CollectorError::Config(format!(
                "max_line_len must be at least {MIN_LINE_LEN}, got {}",
                self.max_line_len
            )));
        }
        Ok(())
    }

    /// Gate options for the registry lock.
    #[must_use]
    pub fn gate_options(&self) -> GateOptions {
        GateOptions {
            concurrency_available: self.concurrency,
            wait: self.wait_strategy,
            max_wait: self.init_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Unset and empty both read as absent.
fn read_var<F>(lookup: &F, key: &str) -> CollectorResult<Option<String>>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match lookup(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(CollectorError::Config(format!(
            "{key} is not valid unicode"
        ))),
    }
}
