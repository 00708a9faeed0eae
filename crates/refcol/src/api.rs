//! # Instrumentation Value Types
//!
//! Arguments of the instrumentation calls that are not registry entries.
//! Parameters the host may pass as null are `Option` on the collector side.

use refcol_core::{DomainRef, MetadataType};

/// Opaque instance id. Accepted by frame and task calls, never logged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Id {
    /// First word.
    pub d1: u64,
    /// Second word.
    pub d2: u64,
    /// Third word.
    pub d3: u64,
}

impl Id {
    /// The null id.
    pub const NULL: Self = Self::new(0, 0, 0);

    /// Id from its three words.
    #[must_use]
    pub const fn new(d1: u64, d2: u64, d3: u64) -> Self {
        Self { d1, d2, d3 }
    }
}

/// Host clock value.
pub type Timestamp = u64;

/// Collection scope bitmask for scoped pause and resume.
pub type CollectionScope = u32;

/// A histogram descriptor.
///
/// `domain` and `name` may be absent, mirroring descriptors created by a
/// host that failed to fill them in; submission then logs a warning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    /// Owning domain.
    pub domain: Option<DomainRef>,
    /// Histogram name.
    pub name: Option<String>,
    /// Raw metadata type tag of the x values.
    pub x_type: u32,
    /// Raw metadata type tag of the y values.
    pub y_type: u32,
}

impl Histogram {
    /// Fully specified histogram.
    pub fn new(
        domain: DomainRef,
        name: impl Into<String>,
        x_type: MetadataType,
        y_type: MetadataType,
    ) -> Self {
        Self {
            domain: Some(domain),
            name: Some(name.into()),
            x_type: x_type.tag(),
            y_type: y_type.tag(),
        }
    }
}

/// A named counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counter {
    /// Counter name.
    pub name: String,
}

impl Counter {
    /// Counter called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
