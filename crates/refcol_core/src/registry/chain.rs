//! # Name Chain
//!
//! Append-only, insertion-ordered list of entries of one kind. Not
//! synchronized on its own: [`Registry`](super::Registry) keeps every chain
//! behind the shared lock.

use super::entry::{EntryKind, EntryRef};

/// Result of a find-or-insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup<K: EntryKind> {
    /// An entry with the name already existed.
    Found(EntryRef<K>),
    /// A new entry was appended.
    Created(EntryRef<K>),
}

impl<K: EntryKind> Lookup<K> {
    /// The entry, regardless of how it was obtained.
    #[must_use]
    pub fn entry(&self) -> &EntryRef<K> {
        match self {
            Self::Found(entry) | Self::Created(entry) => entry,
        }
    }

    /// Consumes the lookup, returning the entry.
    #[must_use]
    pub fn into_entry(self) -> EntryRef<K> {
        match self {
            Self::Found(entry) | Self::Created(entry) => entry,
        }
    }

    /// Returns true if the entry was created by this lookup.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Deduplicating, insertion-ordered collection of named entries.
///
/// Lookups scan from the oldest entry. Registries hold a handful of names
/// and are insert-dominated, so a linear scan beats hashing here.
pub struct NameRegistry<K: EntryKind> {
    entries: Vec<EntryRef<K>>,
}

impl<K: EntryKind> NameRegistry<K> {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry exists.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry with exactly this name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&EntryRef<K>> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Finds the entry with this name, appending a new one at the tail if
    /// none exists. Returns `None` for an empty name.
    pub fn find_or_insert(&mut self, name: &str) -> Option<Lookup<K>> {
        if name.is_empty() {
            return None;
        }

        if let Some(existing) = self.find(name) {
            return Some(Lookup::Found(existing.clone()));
        }

        let entry = EntryRef::new(name);
        self.entries.push(entry.clone());
        Some(Lookup::Created(entry))
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &EntryRef<K>> {
        self.entries.iter()
    }

    /// The most recently appended entry.
    #[must_use]
    pub fn tail(&self) -> Option<&EntryRef<K>> {
        self.entries.last()
    }
}

impl<K: EntryKind> Default for NameRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntryKind> std::fmt::Debug for NameRegistry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter().map(EntryRef::name)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::entry::Domain;

    #[test]
    fn test_find_or_insert_dedups() {
        let mut chain: NameRegistry<Domain> = NameRegistry::new();

        let first = chain.find_or_insert("render").unwrap();
        assert!(first.was_created());

        let again = chain.find_or_insert("render").unwrap();
        assert!(!again.was_created());
        assert_eq!(first.entry(), again.entry());
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_appends_at_tail() {
        let mut chain: NameRegistry<Domain> = NameRegistry::new();
        for name in ["a", "b", "c", "b"] {
            let _ = chain.find_or_insert(name);
        }

        let names: Vec<&str> = chain.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(chain.tail().unwrap().name(), "c");
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut chain: NameRegistry<Domain> = NameRegistry::new();
        assert!(chain.find_or_insert("").is_none());
        assert!(chain.is_empty());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut chain: NameRegistry<Domain> = NameRegistry::new();
        let lower = chain.find_or_insert("gpu").unwrap().into_entry();
        let upper = chain.find_or_insert("GPU").unwrap().into_entry();
        assert_ne!(lower, upper);
        assert_eq!(chain.len(), 2);
    }
}
