//! # REFCOL
//!
//! Reference collector for the instrumentation API: every call is checked,
//! rendered and written as one line to an event log.
//!
//! ## Architecture Rules
//!
//! 1. **Never fail the host** - Bad input is logged, never returned or panicked on
//! 2. **Validate, then format** - Rejected calls render nothing
//! 3. **One line per call** - Appends are serialized, lines never interleave
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use refcol::{Collector, CollectorConfig};
//! use refcol_core::{MemoryLogger, MetadataSlice};
//! use refcol::api::Id;
//!
//! let logger = Arc::new(MemoryLogger::new());
//! let collector = Collector::new(CollectorConfig::default(), logger.clone());
//!
//! let domain = collector.domain_create("gpu");
//! collector.metadata_add_values(domain.as_ref(), Id::NULL, None, MetadataSlice::U16(&[4, 2]));
//! assert_eq!(
//!     logger.last().unwrap().message,
//!     "functions args: domain=gpu metadata_size=2 metadata[]=4;2;"
//! );
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod sink;
pub mod symbols;

pub use collector::Collector;
pub use config::{CollectorConfig, SinkKind};
pub use error::{CollectorError, CollectorResult};
pub use logging::init_tracing;
pub use sink::{FileSink, TracingSink};
pub use symbols::{ErrorCode, ErrorHandler, NoSymbols, StaticResolver, SymbolResolver};

use refcol_core::OnceGate;

static GLOBAL: OnceGate<Option<Collector>> = OnceGate::new();

/// The process-wide collector, built from the environment on first use.
///
/// Returns `None` if it could not be built; that outcome is final.
pub fn global() -> Option<&'static Collector> {
    let collector = GLOBAL.get_or_init(|| match Collector::from_env(&NoSymbols) {
        Ok(collector) => Some(collector),
        Err(err) => {
            tracing::error!(error = %err, "process-wide collector unavailable");
            None
        }
    });
    collector.ok()?.as_ref()
}
