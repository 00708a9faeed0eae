//! # One-Time Initialization Gate
//!
//! Constructs a shared value exactly once under concurrent first use,
//! without needing a lock that already exists.
//!
//! ## State Machine
//!
//! ```text
//!                 CAS (one winner)            Release store
//!  Uninitialized ──────────────────► Initializing ──────────────► Ready
//!                                         │
//!                                         └──────────────────────► Failed
//!                                          initializer error/unwind
//! ```
//!
//! Losers of the CAS never run the initializer. They wait until the state
//! leaves `Initializing`, either parked on a condition variable or spinning
//! with `yield_now`. A `Failed` gate stays failed: every caller gets the
//! initializer's error, nobody retries.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;
const FAILED: u8 = 3;

/// Observable state of a [`OnceGate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    /// Nobody has asked for the value yet.
    Uninitialized,
    /// One thread is constructing the value.
    Initializing,
    /// The value is published.
    Ready,
    /// Construction failed; the failure is final.
    Failed,
}

impl GateState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            UNINITIALIZED => Self::Uninitialized,
            INITIALIZING => Self::Initializing,
            READY => Self::Ready,
            _ => Self::Failed,
        }
    }
}

/// How losers of the initialization race wait for the winner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategy {
    /// Sleep on a condition variable until the winner publishes.
    #[default]
    Park,
    /// Poll the state, yielding the processor between polls.
    Yield,
}

/// Construction-time options for a [`OnceGate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateOptions {
    /// False when the host has no threading support. Initialization then
    /// runs directly, without CAS or waiting.
    pub concurrency_available: bool,
    /// Waiting behavior for CAS losers.
    pub wait: WaitStrategy,
    /// Upper bound on how long a loser waits. `None` waits forever.
    pub max_wait: Option<Duration>,
}

impl GateOptions {
    /// Threaded, parking, unbounded wait.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            concurrency_available: true,
            wait: WaitStrategy::Park,
            max_wait: None,
        }
    }

    /// Options for a host without threads.
    #[must_use]
    pub const fn single_threaded() -> Self {
        Self {
            concurrency_available: false,
            wait: WaitStrategy::Park,
            max_wait: None,
        }
    }
}

impl Default for GateOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazily constructed value with a race-free one-time initializer.
///
/// Unlike [`std::sync::OnceLock`], a failed initialization is sticky and the
/// waiting behavior is configurable.
///
/// # Example
///
/// ```rust
/// use parking_lot::Mutex;
/// use refcol_core::sync::OnceGate;
///
/// static LOCK: OnceGate<Mutex<Vec<u32>>> = OnceGate::new();
///
/// let lock = LOCK.get_or_init(|| Mutex::new(Vec::new())).unwrap();
/// lock.lock().push(7);
/// assert!(LOCK.get().is_some());
/// ```
pub struct OnceGate<T> {
    state: AtomicU8,
    value: OnceLock<T>,
    failure: OnceLock<CoreError>,
    wakeup: Mutex<()>,
    published: Condvar,
    options: GateOptions,
}

impl<T> OnceGate<T> {
    /// Creates an empty gate with default options.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_options(GateOptions::new())
    }

    /// Creates an empty gate.
    #[must_use]
    pub const fn with_options(options: GateOptions) -> Self {
        Self {
            state: AtomicU8::new(UNINITIALIZED),
            value: OnceLock::new(),
            failure: OnceLock::new(),
            wakeup: parking_lot::const_mutex(()),
            published: Condvar::new(),
            options,
        }
    }

    /// Options this gate was built with.
    #[inline]
    #[must_use]
    pub const fn options(&self) -> GateOptions {
        self.options
    }

    /// Capability flag fixed at construction.
    #[inline]
    #[must_use]
    pub const fn concurrency_available(&self) -> bool {
        self.options.concurrency_available
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> GateState {
        GateState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Returns the value if it is published.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns the value, constructing it with `init` on first use.
    ///
    /// # Errors
    ///
    /// [`CoreError::InitializationTimeout`] if this caller lost the race and
    /// `max_wait` elapsed. [`CoreError::InitializationFailed`] if a previous
    /// initializer unwound.
    pub fn get_or_init<F>(&self, init: F) -> CoreResult<&T>
    where
        F: FnOnce() -> T,
    {
        self.get_or_try_init(|| Ok(init()))
    }

    /// Returns the value, constructing it with a fallible `init` on first use.
    ///
    /// `init` runs at most once over the lifetime of the gate.
    ///
    /// # Errors
    ///
    /// The error returned by `init`, to this caller and every later one.
    /// [`CoreError::InitializationTimeout`] as for [`Self::get_or_init`].
    pub fn get_or_try_init<F>(&self, init: F) -> CoreResult<&T>
    where
        F: FnOnce() -> CoreResult<T>,
    {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        if !self.options.concurrency_available {
            return self.init_unsynchronized(init);
        }

        match self.state.compare_exchange(
            UNINITIALIZED,
            INITIALIZING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => self.run_initializer(init),
            Err(_) => self.wait_for_outcome(),
        }
    }

    fn init_unsynchronized<F>(&self, init: F) -> CoreResult<&T>
    where
        F: FnOnce() -> CoreResult<T>,
    {
        if self.state.load(Ordering::Relaxed) == FAILED {
            return Err(self.failure());
        }
        self.state.store(INITIALIZING, Ordering::Relaxed);
        self.run_initializer(init)
    }

    fn run_initializer<F>(&self, init: F) -> CoreResult<&T>
    where
        F: FnOnce() -> CoreResult<T>,
    {
        let mut guard = UnwindGuard { gate: self, armed: true };
        let outcome = init();
        guard.armed = false;

        match outcome {
            Ok(value) => {
                let value = self.value.get_or_init(|| value);
                self.publish(READY);
                Ok(value)
            }
            Err(err) => {
                let _ = self.failure.set(err.clone());
                self.publish(FAILED);
                Err(err)
            }
        }
    }

    /// Release-stores the final state, then wakes parked waiters.
    ///
    /// The notify happens under `wakeup`, so a waiter that saw `Initializing`
    /// while holding the lock cannot miss it.
    fn publish(&self, state: u8) {
        self.state.store(state, Ordering::Release);
        let _wakeup = self.wakeup.lock();
        self.published.notify_all();
    }

    fn wait_for_outcome(&self) -> CoreResult<&T> {
        let started = Instant::now();
        let deadline = self.options.max_wait.map(|max| started + max);

        match self.options.wait {
            WaitStrategy::Yield => {
                while self.state.load(Ordering::Acquire) == INITIALIZING {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return Err(timeout_since(started));
                    }
                    std::thread::yield_now();
                }
            }
            WaitStrategy::Park => {
                let mut wakeup = self.wakeup.lock();
                while self.state.load(Ordering::Acquire) == INITIALIZING {
                    match deadline {
                        Some(deadline) => {
                            let timed_out = self.published.wait_until(&mut wakeup, deadline).timed_out();
                            if timed_out && self.state.load(Ordering::Acquire) == INITIALIZING {
                                return Err(timeout_since(started));
                            }
                        }
                        None => self.published.wait(&mut wakeup),
                    }
                }
            }
        }

        self.settled()
    }

    fn settled(&self) -> CoreResult<&T> {
        match self.state.load(Ordering::Acquire) {
            READY => self
                .value
                .get()
                .ok_or_else(|| CoreError::init_failed("gate published without a value")),
            _ => Err(self.failure()),
        }
    }

    fn failure(&self) -> CoreError {
        self.failure
            .get()
            .cloned()
            .unwrap_or_else(|| CoreError::init_failed("initializer did not complete"))
    }
}

impl<T> Default for OnceGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for OnceGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceGate")
            .field("state", &self.state())
            .field("value", &self.value.get())
            .field("options", &self.options)
            .finish()
    }
}

/// Marks the gate failed if the initializer unwinds, so waiters wake up.
struct UnwindGuard<'a, T> {
    gate: &'a OnceGate<T>,
    armed: bool,
}

impl<T> Drop for UnwindGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self
                .gate
                .failure
                .set(CoreError::init_failed("initializer panicked"));
            self.gate.publish(FAILED);
        }
    }
}

fn timeout_since(started: Instant) -> CoreError {
    CoreError::InitializationTimeout {
        waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}
