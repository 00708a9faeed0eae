//! # Name Registry
//!
//! Domains and string handles are interned by name. Each name maps to
//! exactly one entry for the life of the registry, and every lookup of that
//! name returns a reference to the same entry.
//!
//! ## Guarantees
//!
//! 1. **Dedup**: distinct entries == distinct names, under any interleaving
//! 2. **Stability**: references stay valid, entries are never moved or freed
//! 3. **Order**: entries are kept in creation order

mod chain;
mod context;
mod entry;

pub use chain::{Lookup, NameRegistry};
pub use context::{Registry, INCORRECT_CALL};
pub use entry::{Domain, DomainRef, EntryKind, EntryRef, NamedEntry, StringHandle, StringHandleRef};
