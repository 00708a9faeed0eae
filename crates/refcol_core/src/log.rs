//! # Event Logging Seam
//!
//! Every component reports through [`EventLogger`]. The core never decides
//! where events end up; the collector crate plugs in a file or `tracing`
//! sink, tests plug in [`MemoryLogger`].
//!
//! Logging is best-effort. Implementations must not panic and must not
//! surface failures to the caller.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity of a logged event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Normal call trace.
    Info,
    /// Precondition violation or unrenderable input.
    Warn,
    /// Recoverable internal failure.
    Error,
    /// The collector cannot work as intended.
    Fatal,
}

impl Level {
    /// Tag written in front of each log line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL_ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest prefix of `text` that fits in `max_len` bytes without splitting
/// a character.
#[must_use]
pub fn clamp_line(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

/// Destination for structured collector events.
pub trait EventLogger: Send + Sync {
    /// Records one event. `source` names the entry point that produced it.
    fn log(&self, level: Level, source: &str, message: &str);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLogger;

impl EventLogger for NullLogger {
    fn log(&self, _level: Level, _source: &str, _message: &str) {}
}

/// One event captured by [`MemoryLogger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity.
    pub level: Level,
    /// Entry point name.
    pub source: String,
    /// Message text.
    pub message: String,
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    /// Creates an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything logged so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Number of events logged at `level`.
    #[must_use]
    pub fn count(&self, level: Level) -> usize {
        self.records.lock().iter().filter(|r| r.level == level).count()
    }

    /// Total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Most recent event, if any.
    #[must_use]
    pub fn last(&self) -> Option<LogRecord> {
        self.records.lock().last().cloned()
    }

    /// Drops everything recorded so far.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl EventLogger for MemoryLogger {
    fn log(&self, level: Level, source: &str, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            source: source.to_owned(),
            message: message.to_owned(),
        });
    }
}
