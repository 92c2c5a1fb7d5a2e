//! # Clock
//!
//! Source of the timestamps stamped on records.
//!
//! Certificate ids and transaction dates come from wall-clock seconds.
//! The clock is injected so that tests and replays can pin time.

use crate::types::UnixSeconds;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of Unix-second timestamps.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> UnixSeconds;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixSeconds {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as UnixSeconds)
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicI64,
}

impl ManualClock {
    /// Create a clock stopped at `start`.
    #[must_use]
    pub fn new(start: UnixSeconds) -> Self {
        Self {
            seconds: AtomicI64::new(start),
        }
    }

    /// Jump to `seconds`.
    pub fn set(&self, seconds: UnixSeconds) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    /// Move forward by `delta` seconds.
    pub fn advance(&self, delta: i64) {
        self.seconds.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixSeconds {
        self.seconds.load(Ordering::SeqCst)
    }
}

/// A shared clock, so a caller can keep moving a clock it handed over.
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> UnixSeconds {
        (**self).now()
    }
}
