//! # Registry Context
//!
//! Owns both name chains behind one lazily constructed lock.
//!
//! ```text
//! find_or_create("gpu")
//!   -> OnceGate: build the Mutex on first use
//!   -> lock
//!        scan chain head..tail, first exact match wins
//!        append at tail if missing
//!   -> unlock
//!   -> report found/created to the event log
//! ```
//!
//! The scan and the append are one critical section, so two threads asking
//! for the same new name can never both create it.

use std::sync::Arc;

use parking_lot::Mutex;

use super::chain::{Lookup, NameRegistry};
use super::entry::{Domain, DomainRef, EntryKind, EntryRef, StringHandle, StringHandleRef};
use crate::error::CoreResult;
use crate::log::{EventLogger, Level};
use crate::sync::{GateOptions, OnceGate};

/// Source name for registry-internal events.
const REGISTRY_SOURCE: &str = "registry";

/// Message logged when a precondition is not met.
pub const INCORRECT_CALL: &str = "Incorrect function call";

/// The chains guarded by the shared lock.
#[derive(Debug, Default)]
struct Chains {
    domains: NameRegistry<Domain>,
    string_handles: NameRegistry<StringHandle>,
}

/// Selects one chain from the guarded set.
trait ChainSelect: EntryKind + Sized {
    fn chain(chains: &mut Chains) -> &mut NameRegistry<Self>;
}

impl ChainSelect for Domain {
    fn chain(chains: &mut Chains) -> &mut NameRegistry<Self> {
        &mut chains.domains
    }
}

impl ChainSelect for StringHandle {
    fn chain(chains: &mut Chains) -> &mut NameRegistry<Self> {
        &mut chains.string_handles
    }
}

/// Thread-safe, deduplicating registry of domains and string handles.
///
/// An explicitly owned context: tests build one per case, the collector
/// owns one for the process.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use refcol_core::{NullLogger, Registry};
///
/// let registry = Registry::new(Arc::new(NullLogger));
/// let a = registry.find_or_create_domain("gpu").unwrap();
/// let b = registry.find_or_create_domain("gpu").unwrap();
/// assert_eq!(a, b);
/// ```
pub struct Registry {
    chains: OnceGate<Mutex<Chains>>,
    logger: Arc<dyn EventLogger>,
}

impl Registry {
    /// Creates a registry with default gate options.
    #[must_use]
    pub fn new(logger: Arc<dyn EventLogger>) -> Self {
        Self::with_options(logger, GateOptions::new())
    }

    /// Creates a registry whose lock is built according to `options`.
    #[must_use]
    pub fn with_options(logger: Arc<dyn EventLogger>, options: GateOptions) -> Self {
        Self {
            chains: OnceGate::with_options(options),
            logger,
        }
    }

    /// Capability flag of the underlying gate.
    #[must_use]
    pub fn concurrency_available(&self) -> bool {
        self.chains.concurrency_available()
    }

    /// Forces construction of the registry lock.
    ///
    /// # Errors
    ///
    /// The gate's error if the lock could not be built or the wait timed out.
    pub fn ensure_initialized(&self) -> CoreResult<()> {
        self.lock_chains().map(|_| ())
    }

    /// Finds the domain named `name`, creating it if needed.
    ///
    /// Returns `None` for an empty name or an unusable registry.
    pub fn find_or_create_domain(&self, name: &str) -> Option<DomainRef> {
        self.find_or_create::<Domain>(name)
    }

    /// Finds the string handle named `name`, creating it if needed.
    ///
    /// Returns `None` for an empty name or an unusable registry.
    pub fn find_or_create_string_handle(&self, name: &str) -> Option<StringHandleRef> {
        self.find_or_create::<StringHandle>(name)
    }

    /// Domains in creation order.
    #[must_use]
    pub fn domains(&self) -> Vec<DomainRef> {
        self.snapshot::<Domain>()
    }

    /// String handles in creation order.
    #[must_use]
    pub fn string_handles(&self) -> Vec<StringHandleRef> {
        self.snapshot::<StringHandle>()
    }

    fn lock_chains(&self) -> CoreResult<&Mutex<Chains>> {
        self.chains.get_or_init(|| {
            tracing::debug!("registry lock constructed");
            Mutex::new(Chains::default())
        })
    }

    fn find_or_create<K: ChainSelect>(&self, name: &str) -> Option<EntryRef<K>> {
        if name.is_empty() {
            self.logger.log(Level::Warn, K::CREATE_SOURCE, INCORRECT_CALL);
            return None;
        }

        let lock = match self.lock_chains() {
            Ok(lock) => lock,
            Err(err) => {
                tracing::debug!(kind = K::LABEL, name, error = %err, "registry unavailable");
                self.logger.log(
                    Level::Error,
                    K::CREATE_SOURCE,
                    &format!("registry unavailable: {err}"),
                );
                return None;
            }
        };

        // Scan and append under one guard.
        let lookup = {
            let mut chains = lock.lock();
            K::chain(&mut chains).find_or_insert(name)
        }?;

        match &lookup {
            Lookup::Found(entry) => {
                tracing::trace!(kind = K::LABEL, name = entry.name(), "found existing entry");
                self.logger.log(
                    Level::Info,
                    REGISTRY_SOURCE,
                    &format!("found existing {} name={}", K::LABEL, entry.name()),
                );
            }
            Lookup::Created(entry) => {
                tracing::trace!(kind = K::LABEL, name = entry.name(), "created new entry");
                self.logger.log(
                    Level::Info,
                    REGISTRY_SOURCE,
                    &format!("created new {} name={}", K::LABEL, entry.name()),
                );
            }
        }

        Some(lookup.into_entry())
    }

    fn snapshot<K: ChainSelect>(&self) -> Vec<EntryRef<K>> {
        match self.chains.get() {
            Some(lock) => K::chain(&mut lock.lock()).iter().cloned().collect(),
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("state", &self.chains.state())
            .field("chains", &self.chains.get())
            .finish_non_exhaustive()
    }
}
