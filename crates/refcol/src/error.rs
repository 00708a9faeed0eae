//! # Collector Error Types

use thiserror::Error;

/// Errors surfaced while building a collector.
///
/// Instrumentation calls themselves never return errors; they log.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Invalid or unreadable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem failure while loading configuration.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for collector construction.
pub type CollectorResult<T> = Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_convert() {
        let err = CollectorError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "refcol.toml"));
        assert!(matches!(err, CollectorError::Io(_)));
        assert_eq!(err.to_string(), "i/o error: refcol.toml");
    }

    #[test]
    fn test_config_message() {
        let err = CollectorError::Config("max_line_len too small".into());
        assert_eq!(err.to_string(), "invalid configuration: max_line_len too small");
    }
}
