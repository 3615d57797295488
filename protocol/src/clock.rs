//! # Clocks
//!
//! The sale phase is a function of time, and time is the one input a test
//! cannot control unless we let it. [`Clock`] is that seam:
//!
//! - [`SystemClock`] reads wall-clock unix seconds via `chrono`.
//! - [`ManualClock`] holds a value that only moves when told to. Tests and
//!   simulations use it to step through the presale/public transition
//!   deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

/// A source of the current unix time in seconds.
pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Pre-1970 clocks are a host misconfiguration; clamp rather than wrap.
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock that advances only when told to.
///
/// Clones share the same underlying time, so a test can hand one clone to
/// the ledger and keep another to move time forward.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock frozen at `start` unix seconds.
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Moves the clock forward by `by`. Saturates at `u64::MAX`.
    pub fn advance(&self, by: Duration) {
        let secs = by.as_secs();
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(secs))
            });
    }

    /// Jumps the clock to an absolute time. May move backwards.
    pub fn set(&self, at: u64) {
        self.now.store(at, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}
