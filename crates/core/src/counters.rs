// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named telemetry counters
//!
//! Drops and failures anywhere in the agent increment one of these;
//! they never surface as errors to callers. The agent logs a one-line
//! summary periodically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A single monotonically increasing counter
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// All counters the agent tracks. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    /// Samples dropped by the distributor on queue overflow
    pub samples_dropped: Counter,
    /// Samples dropped by a full history ring
    pub history_evictions: Counter,
    /// Assemblies dropped because the sender queue stayed full
    pub payloads_dropped: Counter,
    /// Fires dropped because a deferred assembly was already pending
    pub deferred_fires_dropped: Counter,
    /// Campaign documents rejected at ingestion
    pub campaigns_rejected: Counter,
    /// Decoder manifests rejected at ingestion
    pub manifests_rejected: Counter,
    /// Transport send attempts that failed
    pub send_failures: Counter,
    /// Payloads spilled to the on-disk store
    pub payloads_persisted: Counter,
    /// Persisted payloads evicted to respect the store quota
    pub store_evictions: Counter,
    /// Persisted records dropped after a filesystem error
    pub persist_failures: Counter,
    /// Fetch actions that evaluated with an error
    pub fetch_errors: Counter,
    /// Commands rejected for lack of a dispatcher
    pub commands_rejected: Counter,
    /// Commands that timed out without a terminal status
    pub commands_timed_out: Counter,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-line `key=value` summary for the periodic log.
    pub fn summary(&self) -> String {
        let entries: [(&str, u64); 13] = [
            ("samples_dropped", self.samples_dropped.get()),
            ("history_evictions", self.history_evictions.get()),
            ("payloads_dropped", self.payloads_dropped.get()),
            ("deferred_fires_dropped", self.deferred_fires_dropped.get()),
            ("campaigns_rejected", self.campaigns_rejected.get()),
            ("manifests_rejected", self.manifests_rejected.get()),
            ("send_failures", self.send_failures.get()),
            ("payloads_persisted", self.payloads_persisted.get()),
            ("store_evictions", self.store_evictions.get()),
            ("persist_failures", self.persist_failures.get()),
            ("fetch_errors", self.fetch_errors.get()),
            ("commands_rejected", self.commands_rejected.get()),
            ("commands_timed_out", self.commands_timed_out.get()),
        ];
        let mut out = String::new();
        for (key, value) in entries {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(&value.to_string());
        }
        out
    }
}

#[cfg(test)]
#[path = "counters_tests.rs"]
mod tests;
