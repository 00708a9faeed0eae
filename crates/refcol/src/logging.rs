//! Diagnostic output for binaries and manual debugging.
//!
//! The collector itself only emits `tracing` events; nothing is printed
//! unless the host installs a subscriber, for example with
//! [`init_tracing`].

use tracing_subscriber::EnvFilter;

use crate::error::{CollectorError, CollectorResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "refcol=info,refcol_core=warn";

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`.
///
/// # Errors
///
/// [`CollectorError::Config`] if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> CollectorResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| CollectorError::Config(format!("bad log filter: {e}")))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| CollectorError::Config(format!("cannot install subscriber: {e}")))
}
