//! # Synchronization Primitives
//!
//! The registry lock cannot guard its own construction. [`OnceGate`] solves
//! that bootstrapping problem:
//!
//! ```text
//! Thread 1:  CAS Uninitialized -> Initializing, build mutex, publish Ready
//! Thread 2:  CAS fails, park until Ready
//! Thread N:  fast path, value already published
//! ```
//!
//! Exactly one construction. Every observer of `Ready` sees the finished value.

mod once_gate;

pub use once_gate::{GateOptions, GateState, OnceGate, WaitStrategy};
