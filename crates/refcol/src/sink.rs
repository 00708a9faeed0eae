//! # Event Sinks
//!
//! `EventLogger` implementations for the collector.
//!
//! ## Log File Format
//!
//! ```text
//! [INFO] __itt_domain_create(...) - function args: name=gpu
//! [WARN] __itt_task_end(...) - Incorrect function call
//! ```
//!
//! One line per event. The file is opened, appended and closed for every
//! line, so a crash never loses more than the line being written.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use parking_lot::Mutex;
use refcol_core::{clamp_line, EventLogger, Level};

use crate::config::{CollectorConfig, SinkKind};

/// Common prefix of every log file name.
pub const LOG_FILE_PREFIX: &str = "libittnotify_refcol_";

/// Log file name for the given local time.
///
/// Fields are not zero-padded, so `2024-03-05 07:08:09` becomes
/// `libittnotify_refcol_202435789.log`.
#[must_use]
pub fn log_file_name(at: &NaiveDateTime) -> String {
    format!(
        "{LOG_FILE_PREFIX}{}{}{}{}{}{}.log",
        at.year(),
        at.month(),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// Directory the log file goes to: the configured one, else `%TEMP%` on
/// Windows, else `/tmp`.
#[must_use]
pub fn resolve_log_dir(configured: Option<&Path>) -> Option<PathBuf> {
    configured.map(Path::to_path_buf).or_else(platform_temp_dir)
}

#[cfg(windows)]
fn platform_temp_dir() -> Option<PathBuf> {
    std::env::var_os("TEMP").map(PathBuf::from)
}

#[cfg(not(windows))]
fn platform_temp_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/tmp"))
}

/// Formats one event as a log line, bounded by `max_line_len` bytes.
#[must_use]
pub fn format_line(level: Level, source: &str, message: &str, max_line_len: usize) -> String {
    let line = format!("[{level}] {source}(...) - {message}");
    clamp_line(&line, max_line_len).to_owned()
}

/// Appends every event to a log file.
///
/// Appends are serialized, so lines from concurrent callers never
/// interleave. If the file cannot be opened the line is dropped; only the
/// first such failure is reported.
pub struct FileSink {
    path: Option<PathBuf>,
    max_line_len: usize,
    write_lock: Mutex<()>,
    open_failure_reported: AtomicBool,
}

impl FileSink {
    /// Sink writing to `path`. `None` drops every event.
    #[must_use]
    pub fn new(path: Option<PathBuf>, max_line_len: usize) -> Self {
        Self {
            path,
            max_line_len,
            write_lock: Mutex::new(()),
            open_failure_reported: AtomicBool::new(false),
        }
    }

    /// Sink for `config`, named after the current local time.
    #[must_use]
    pub fn from_config(config: &CollectorConfig) -> Self {
        let name = log_file_name(&Local::now().naive_local());
        let path = resolve_log_dir(config.log_dir.as_deref()).map(|dir| dir.join(name));
        tracing::debug!(path = ?path, "collector log file");
        Self::new(path, config.max_line_len)
    }

    /// Target file, if one could be resolved.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let path = self.path.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no log directory could be resolved")
        })?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")
    }
}

impl EventLogger for FileSink {
    fn log(&self, level: Level, source: &str, message: &str) {
        let line = format_line(level, source, message, self.max_line_len);

        let result = {
            let _guard = self.write_lock.lock();
            self.append(&line)
        };

        if let Err(err) = result {
            if !self.open_failure_reported.swap(true, Ordering::Relaxed) {
                tracing::error!(path = ?self.path, error = %err, "cannot open collector log file");
            }
        }
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("max_line_len", &self.max_line_len)
            .finish_non_exhaustive()
    }
}

/// Forwards every event to `tracing` under the `refcol` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventLogger for TracingSink {
    fn log(&self, level: Level, source: &str, message: &str) {
        match level {
            Level::Info => tracing::info!(target: "refcol", source, "{message}"),
            Level::Warn => tracing::warn!(target: "refcol", source, "{message}"),
            Level::Error => tracing::error!(target: "refcol", source, "{message}"),
            Level::Fatal => tracing::error!(target: "refcol", source, fatal = true, "{message}"),
        }
    }
}

/// Builds the sink `config` asks for.
#[must_use]
pub fn build_sink(config: &CollectorConfig) -> Arc<dyn EventLogger> {
    match config.sink {
        SinkKind::File => Arc::new(FileSink::from_config(config)),
        SinkKind::Tracing => Arc::new(TracingSink),
    }
}
