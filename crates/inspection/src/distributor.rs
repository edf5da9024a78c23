// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal buffer distributor
//!
//! Fan-in from all source adapters to the single evaluator task.
//! Bounded; a full queue drops the oldest queued sample so fresh data
//! always gets in. Producers never block and never fail.

use canopy_core::{Counters, DecodedValue, SignalId, SignalType, SourceTag};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// A decoded sample on its way into the engine. Values still carry the
/// adapter representation; the engine types them against the ring (and
/// interns strings) at ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSample {
    pub signal_id: SignalId,
    pub signal_type: SignalType,
    pub monotonic_ts_ms: u64,
    pub wall_ts_ms: u64,
    pub value: DecodedValue,
    pub source: SourceTag,
}

struct Shared {
    queue: Mutex<VecDeque<DecodedSample>>,
    capacity: usize,
    notify: Notify,
    counters: Counters,
}

/// Producer handle; cheap to clone, one per source adapter.
#[derive(Clone)]
pub struct DistributorHandle {
    shared: Arc<Shared>,
}

impl DistributorHandle {
    /// Enqueue a sample. On overflow the oldest queued sample is
    /// dropped and counted.
    pub fn push(&self, sample: DecodedSample) {
        {
            let mut queue = self.shared.queue.lock();
            if queue.len() == self.shared.capacity {
                queue.pop_front();
                self.shared.counters.samples_dropped.increment();
            }
            queue.push_back(sample);
        }
        self.shared.notify.notify_one();
    }

    /// Atomic multi-sample push: either all entries are queued in order
    /// or (on overflow) the oldest entries make room one by one.
    pub fn push_all(&self, samples: impl IntoIterator<Item = DecodedSample>) {
        {
            let mut queue = self.shared.queue.lock();
            for sample in samples {
                if queue.len() == self.shared.capacity {
                    queue.pop_front();
                    self.shared.counters.samples_dropped.increment();
                }
                queue.push_back(sample);
            }
        }
        self.shared.notify.notify_one();
    }
}

/// Consumer side, owned by the inspection engine.
pub struct SignalBufferDistributor {
    shared: Arc<Shared>,
}

impl SignalBufferDistributor {
    pub fn new(capacity: usize, counters: Counters) -> (Self, DistributorHandle) {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4_096))),
            capacity: capacity.max(1),
            notify: Notify::new(),
            counters,
        });
        (Self { shared: shared.clone() }, DistributorHandle { shared })
    }

    /// Wait until at least one sample is queued.
    pub async fn wait(&self) {
        loop {
            if !self.shared.queue.lock().is_empty() {
                return;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Take everything currently queued, in arrival order.
    pub fn drain(&self) -> Vec<DecodedSample> {
        let mut queue = self.shared.queue.lock();
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "distributor_tests.rs"]
mod tests;
