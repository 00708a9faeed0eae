//! # REFCOL Core
//!
//! The concurrency and rendering core of the instrumentation reference
//! collector:
//! - `OnceGate`: race-free, one-time construction of a shared value
//! - `Registry`: deduplicating domain and string handle chains
//! - `MetadataFormatter`: typed buffers rendered as `;`-delimited text
//!
//! ## Architecture Rules
//!
//! 1. **One entry per name** - Lookup and insert happen under one lock
//! 2. **Stable references** - Entries are never moved, mutated or freed
//! 3. **Logging never fails** - Every component reports through [`EventLogger`]
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use refcol_core::{MemoryLogger, MetadataFormatter, Registry};
//!
//! let logger = Arc::new(MemoryLogger::new());
//! let registry = Registry::new(logger.clone());
//! let domain = registry.find_or_create_domain("gpu").unwrap();
//! assert_eq!(domain.name(), "gpu");
//!
//! let formatter = MetadataFormatter::new(logger);
//! assert_eq!(formatter.format_values((&[1u32, 2, 3][..]).into()), "1;2;3;");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod log;
pub mod metadata;
pub mod registry;
pub mod sync;

pub use error::{CoreError, CoreResult};
pub use log::{clamp_line, EventLogger, Level, LogRecord, MemoryLogger, NullLogger};
pub use metadata::{
    ContextMetadata, ContextType, ContextValue, FormatArg, MetadataFormatter, MetadataSlice,
    MetadataType, DEFAULT_MAX_LINE_LEN, UNKNOWN_PLACEHOLDER,
};
pub use registry::{
    Domain, DomainRef, EntryRef, Registry, StringHandle, StringHandleRef, INCORRECT_CALL,
};
pub use sync::{GateOptions, GateState, OnceGate, WaitStrategy};
