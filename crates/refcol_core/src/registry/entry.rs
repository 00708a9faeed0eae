//! # Named Entries
//!
//! Domains and string handles share one representation: an immutable,
//! non-empty name. The kind is a zero-sized marker so a domain reference can
//! never be passed where a string handle is expected.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// Marker trait for the kinds of entry a registry can hold.
pub trait EntryKind: Send + Sync + 'static {
    /// Human-readable kind, used in log messages.
    const LABEL: &'static str;
    /// Entry point name reported to the event log.
    const CREATE_SOURCE: &'static str;
}

/// A named grouping under which events are emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Domain;

impl EntryKind for Domain {
    const LABEL: &'static str = "domain";
    const CREATE_SOURCE: &'static str = "__itt_domain_create";
}

/// An interned label reused across instrumentation calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StringHandle;

impl EntryKind for StringHandle {
    const LABEL: &'static str = "string handle";
    const CREATE_SOURCE: &'static str = "__itt_string_handle_create";
}

/// A registry entry. Immutable once created.
pub struct NamedEntry<K> {
    name: Box<str>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: EntryKind> NamedEntry<K> {
    /// The entry's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<K: EntryKind> fmt::Debug for NamedEntry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedEntry")
            .field("kind", &K::LABEL)
            .field("name", &self.name)
            .finish()
    }
}

/// Shared reference to a registry entry.
///
/// Two references are equal exactly when they point at the same entry.
/// Since a registry never holds two entries with one name, that is the same
/// as name equality within a registry.
pub struct EntryRef<K> {
    entry: Arc<NamedEntry<K>>,
}

impl<K: EntryKind> EntryRef<K> {
    /// Builds a fresh entry. Callers guarantee `name` is non-empty.
    pub(crate) fn new(name: &str) -> Self {
        debug_assert!(!name.is_empty(), "registry entries need a name");
        Self {
            entry: Arc::new(NamedEntry {
                name: name.into(),
                _kind: PhantomData,
            }),
        }
    }

    /// The entry's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    /// Returns true if both references point at the same entry.
    #[inline]
    #[must_use]
    pub fn same_entry(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}

impl<K> Clone for EntryRef<K> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<K: EntryKind> Deref for EntryRef<K> {
    type Target = NamedEntry<K>;

    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}

impl<K: EntryKind> PartialEq for EntryRef<K> {
    fn eq(&self, other: &Self) -> bool {
        self.same_entry(other)
    }
}

impl<K: EntryKind> Eq for EntryRef<K> {}

impl<K: EntryKind> Hash for EntryRef<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.entry), state);
    }
}

impl<K: EntryKind> fmt::Debug for EntryRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.entry, f)
    }
}

impl<K: EntryKind> fmt::Display for EntryRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a domain.
pub type DomainRef = EntryRef<Domain>;

/// Reference to a string handle.
pub type StringHandleRef = EntryRef<StringHandle>;
