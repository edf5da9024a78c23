// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud-assigned document IDs and per-trigger event IDs

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque identifier the cloud assigns to a campaign or decoder
/// manifest document. Canopy never interprets its contents.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SyncId(SmolStr);

impl SyncId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// An empty ID is never a valid document reference.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for SyncId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SyncId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SyncId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for SyncId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Unique identifier assigned at trigger time.
///
/// Correlates the in-memory payload, the persisted file pair, and the
/// transmitted message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic event ID source, seeded from wall time so IDs remain
/// unique across process restarts without persisting a counter.
#[derive(Clone)]
pub struct EventIdGenerator {
    next: Arc<AtomicU64>,
}

impl EventIdGenerator {
    /// `seed_epoch_ms` is typically the current wall time at startup.
    pub fn new(seed_epoch_ms: u64) -> Self {
        // Leave room for ~1M ids per millisecond of seed spacing
        Self { next: Arc::new(AtomicU64::new(seed_epoch_ms << 20)) }
    }

    pub fn next(&self) -> EventId {
        EventId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
#[path = "sync_id_tests.rs"]
mod tests;
