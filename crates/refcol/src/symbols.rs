//! # Platform Hooks
//!
//! Optional functions the host may provide, looked up by name once at
//! startup. Anything the resolver does not know keeps its no-op fallback,
//! so calling a hook is always safe.
//!
//! ```text
//! SymbolTable [("__itt_error_handler", noop)]
//!     -- bind(resolver) -->
//! SymbolTable [("__itt_error_handler", host_fn)]   or unchanged
//! ```

use std::collections::HashMap;
use std::fmt;

/// Name the error handler hook is resolved under.
pub const ERROR_HANDLER_SYMBOL: &str = "__itt_error_handler";

/// Error categories reported to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// An environment variable could not be read.
    CantReadEnv,
    /// A system resource failed.
    System,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CantReadEnv => "cannot read environment",
            Self::System => "system error",
        })
    }
}

/// Host callback for collector errors.
pub type ErrorHandler = fn(ErrorCode, &str);

/// Default error handler: does nothing.
pub fn noop_error_handler(_code: ErrorCode, _message: &str) {}

/// Maps symbol names to functions.
pub trait SymbolResolver<F> {
    /// Looks up `name`. `None` means the host does not provide it.
    fn resolve(&self, name: &str) -> Option<F>;
}

/// Resolves nothing; every hook keeps its fallback.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSymbols;

impl<F> SymbolResolver<F> for NoSymbols {
    fn resolve(&self, _name: &str) -> Option<F> {
        None
    }
}

/// In-memory resolver for statically linked hosts and tests.
#[derive(Clone, Debug)]
pub struct StaticResolver<F> {
    symbols: HashMap<String, F>,
}

impl<F: Copy> StaticResolver<F> {
    /// Empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
        }
    }

    /// Adds a symbol, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, function: F) -> Self {
        self.insert(name, function);
        self
    }

    /// Adds or replaces a symbol.
    pub fn insert(&mut self, name: impl Into<String>, function: F) {
        self.symbols.insert(name.into(), function);
    }
}

impl<F: Copy> Default for StaticResolver<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Copy> SymbolResolver<F> for StaticResolver<F> {
    fn resolve(&self, name: &str) -> Option<F> {
        self.symbols.get(name).copied()
    }
}

/// Outcome of [`SymbolTable::bind`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Symbols the resolver provided.
    pub resolved: Vec<&'static str>,
    /// Symbols left at their fallback.
    pub fallback: Vec<&'static str>,
}

#[derive(Clone, Copy)]
struct Slot<F> {
    name: &'static str,
    fallback: F,
    bound: Option<F>,
}

/// Ordered table of named hooks with fallbacks.
#[derive(Clone)]
pub struct SymbolTable<F> {
    slots: Vec<Slot<F>>,
}

impl<F: Copy> SymbolTable<F> {
    /// Empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Declares a hook, builder style.
    #[must_use]
    pub fn with_symbol(mut self, name: &'static str, fallback: F) -> Self {
        self.slots.push(Slot {
            name,
            fallback,
            bound: None,
        });
        self
    }

    /// Resolves every declared hook. Rebinding replaces earlier results.
    pub fn bind(&mut self, resolver: &dyn SymbolResolver<F>) -> BindReport {
        let mut report = BindReport::default();
        for slot in &mut self.slots {
            slot.bound = resolver.resolve(slot.name);
            if slot.bound.is_some() {
                report.resolved.push(slot.name);
            } else {
                report.fallback.push(slot.name);
            }
        }
        report
    }

    /// The bound function, or the fallback. `None` if `name` was never
    /// declared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<F> {
        self.slot(name).map(|slot| slot.bound.unwrap_or(slot.fallback))
    }

    /// Returns true if the resolver provided `name`.
    #[must_use]
    pub fn is_resolved(&self, name: &str) -> bool {
        self.slot(name).is_some_and(|slot| slot.bound.is_some())
    }

    /// Number of declared hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no hooks are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, name: &str) -> Option<&Slot<F>> {
        self.slots.iter().find(|slot| slot.name == name)
    }
}

impl<F: Copy> Default for SymbolTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for SymbolTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .map(|slot| (slot.name, if slot.bound.is_some() { "bound" } else { "fallback" })),
            )
            .finish()
    }
}

/// Hook table the collector declares.
#[must_use]
pub fn collector_hooks() -> SymbolTable<ErrorHandler> {
    SymbolTable::new().with_symbol(ERROR_HANDLER_SYMBOL, noop_error_handler as ErrorHandler)
}
