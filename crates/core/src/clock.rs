// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Every component that reads time takes a [`Clock`] at construction.
//! Monotonic time drives ordering and windows; epoch time is what goes
//! into payloads and check-ins.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides monotonic and wall-clock time in milliseconds
pub trait Clock: Clone + Send + Sync + 'static {
    /// Milliseconds from an arbitrary fixed origin; never goes backwards.
    fn monotonic_ms(&self) -> u64;
    /// Milliseconds since the Unix epoch; may jump on clock adjustments.
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

struct FakeClockState {
    monotonic_ms: u64,
    epoch_ms: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                monotonic_ms: 0,
                epoch_ms: 1_000_000,
            })),
        }
    }

    /// Advance both monotonic and epoch time by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock();
        state.monotonic_ms += duration.as_millis() as u64;
        state.epoch_ms += duration.as_millis() as u64;
    }

    /// Advance both monotonic and epoch time by `ms` milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Set the monotonic milliseconds value
    pub fn set_monotonic_ms(&self, ms: u64) {
        self.inner.lock().monotonic_ms = ms;
    }

    /// Set the epoch milliseconds value
    pub fn set_epoch_ms(&self, ms: u64) {
        self.inner.lock().epoch_ms = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn monotonic_ms(&self) -> u64 {
        self.inner.lock().monotonic_ms
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
