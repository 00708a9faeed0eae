//! # Metadata Rendering
//!
//! Turns typed instrumentation payloads into log text.
//!
//! ```text
//! (type_tag, count, bytes) ──► MetadataFormatter ──► "1;2;3;"
//! ContextMetadata          ──► MetadataFormatter ──► "gpu0;"
//! (template, args)         ──► printf::render    ──► "frame 3 took 1.5ms"
//! ```
//!
//! Rendering never touches the registry and never fails: unknown tags give
//! a placeholder plus a warning.

mod formatter;
pub mod printf;
mod types;

pub use formatter::{MetadataFormatter, DEFAULT_MAX_LINE_LEN, UNKNOWN_PLACEHOLDER};
pub use printf::FormatArg;
pub use types::{ContextMetadata, ContextType, ContextValue, MetadataSlice, MetadataType};
