// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-signal bounded history rings
//!
//! The single data store the evaluator reads. Capacity and retention
//! per signal are the maximum over all campaigns that reference the
//! signal, recomputed on every reconcile. Samples are ordered by a
//! clamped monotonic timestamp; the original wall timestamp rides
//! along untouched.

use crate::arena::StringArena;
use canopy_campaign::SignalRetention;
use canopy_core::{Counters, Sample, SignalId, SignalValue, StringHandle};
use std::collections::{HashMap, VecDeque};

/// Reduction over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Min,
    Max,
    Avg,
    Count,
    Last,
    /// Last value of the window immediately before the current one
    PrevLast,
}

/// Result of a window reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReduceOutcome {
    /// `partial` is set when the window reaches past the oldest
    /// retained sample
    Value { value: f64, partial: bool },
    /// A sample in the window has no numeric lift
    TypeMismatch,
    NoSamples,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    monotonic_ts_ms: u64,
    wall_ts_ms: u64,
    value: SignalValue,
}

struct Ring {
    capacity: usize,
    window_ms: u64,
    entries: VecDeque<Entry>,
    last_monotonic_ms: u64,
    ever_seen: bool,
}

impl Ring {
    fn new(retention: SignalRetention) -> Self {
        Self {
            capacity: retention.max_samples,
            window_ms: retention.window_ms,
            entries: VecDeque::with_capacity(retention.max_samples.min(1_024)),
            last_monotonic_ms: 0,
            ever_seen: false,
        }
    }
}

pub struct SignalHistoryBuffer {
    rings: HashMap<SignalId, Ring>,
    arena: StringArena,
    counters: Counters,
}

impl SignalHistoryBuffer {
    pub fn new(counters: Counters) -> Self {
        Self { rings: HashMap::new(), arena: StringArena::new(), counters }
    }

    /// Replace the retention requirements. Rings for signals nobody
    /// needs any more are dropped (releasing their string handles);
    /// shrunk rings evict oldest-first.
    pub fn reconcile(&mut self, requirements: &HashMap<SignalId, SignalRetention>) {
        let stale: Vec<SignalId> =
            self.rings.keys().filter(|id| !requirements.contains_key(id)).copied().collect();
        for id in stale {
            if let Some(ring) = self.rings.remove(&id) {
                for entry in &ring.entries {
                    if let SignalValue::String(handle) = entry.value {
                        self.arena.release(handle);
                    }
                }
            }
        }
        for (&id, &retention) in requirements {
            match self.rings.get_mut(&id) {
                Some(ring) => {
                    ring.capacity = retention.max_samples;
                    ring.window_ms = retention.window_ms;
                    while ring.entries.len() > ring.capacity {
                        if let Some(evicted) = ring.entries.pop_front() {
                            if let SignalValue::String(handle) = evicted.value {
                                self.arena.release(handle);
                            }
                        }
                    }
                }
                None => {
                    self.rings.insert(id, Ring::new(retention));
                }
            }
        }
    }

    /// Intern a decoded string so it can be stored as a handle.
    pub fn intern(&mut self, value: &str) -> StringHandle {
        self.arena.insert(value)
    }

    pub fn resolve(&self, handle: StringHandle) -> Option<&str> {
        self.arena.get(handle)
    }

    /// Insert one sample. Signals without a ring (no campaign wants
    /// them) are ignored. Never fails; overflow evicts the oldest entry
    /// and counts it.
    pub fn ingest(&mut self, sample: Sample) {
        let Some(ring) = self.rings.get_mut(&sample.signal_id) else {
            if let SignalValue::String(handle) = sample.value {
                self.arena.release(handle);
            }
            return;
        };
        // Non-monotonic arrivals are clamped so readers always observe
        // a non-decreasing sequence
        let monotonic = sample.monotonic_ts_ms.max(ring.last_monotonic_ms);
        ring.last_monotonic_ms = monotonic;
        ring.ever_seen = true;
        if ring.entries.len() == ring.capacity {
            if let Some(evicted) = ring.entries.pop_front() {
                if let SignalValue::String(handle) = evicted.value {
                    self.arena.release(handle);
                }
            }
            self.counters.history_evictions.increment();
        }
        ring.entries.push_back(Entry {
            monotonic_ts_ms: monotonic,
            wall_ts_ms: sample.wall_ts_ms,
            value: sample.value,
        });
    }

    /// Drop samples that have aged out of every window ending at `now`.
    pub fn evict_expired(&mut self, now_monotonic_ms: u64) {
        for ring in self.rings.values_mut() {
            // Keep one sample beyond the window so `prev_last` and
            // `latest` still have something to say
            let cutoff = now_monotonic_ms.saturating_sub(ring.window_ms.saturating_mul(2));
            while ring.entries.len() > 1 {
                match ring.entries.front() {
                    Some(front) if front.monotonic_ts_ms < cutoff => {
                        if let Some(evicted) = ring.entries.pop_front() {
                            if let SignalValue::String(handle) = evicted.value {
                                self.arena.release(handle);
                            }
                        }
                    }
                    _ => break,
                }
            }
        }
    }

    /// Whether the signal has ever been ingested since its ring exists.
    pub fn has_seen(&self, signal_id: SignalId) -> bool {
        self.rings.get(&signal_id).map(|r| r.ever_seen).unwrap_or(false)
    }

    pub fn latest(&self, signal_id: SignalId) -> Option<(u64, u64, SignalValue)> {
        let ring = self.rings.get(&signal_id)?;
        ring.entries.back().map(|e| (e.monotonic_ts_ms, e.wall_ts_ms, e.value))
    }

    /// Newest sample at or before `ts` (monotonic).
    pub fn at_or_before(&self, signal_id: SignalId, ts: u64) -> Option<(u64, u64, SignalValue)> {
        let ring = self.rings.get(&signal_id)?;
        ring.entries
            .iter()
            .rev()
            .find(|e| e.monotonic_ts_ms <= ts)
            .map(|e| (e.monotonic_ts_ms, e.wall_ts_ms, e.value))
    }

    /// Reduce over `[now - window_ms, now]`.
    pub fn reduce(
        &self,
        signal_id: SignalId,
        now_monotonic_ms: u64,
        window_ms: u64,
        reduction: Reduction,
    ) -> ReduceOutcome {
        let Some(ring) = self.rings.get(&signal_id) else { return ReduceOutcome::NoSamples };
        let window_start = now_monotonic_ms.saturating_sub(window_ms);

        if reduction == Reduction::PrevLast {
            // Last sample of the prior window [now - 2w, now - w)
            let prior_start = now_monotonic_ms.saturating_sub(window_ms.saturating_mul(2));
            let found = ring
                .entries
                .iter()
                .rev()
                .find(|e| e.monotonic_ts_ms < window_start && e.monotonic_ts_ms >= prior_start);
            return match found {
                Some(entry) => match entry.value.as_f64() {
                    Some(value) => ReduceOutcome::Value { value, partial: false },
                    None => ReduceOutcome::TypeMismatch,
                },
                None => ReduceOutcome::NoSamples,
            };
        }

        let oldest = match ring.entries.front() {
            Some(front) => front.monotonic_ts_ms,
            None => return ReduceOutcome::NoSamples,
        };
        let partial = window_start < oldest;

        let mut count = 0u64;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut last = 0.0;
        for entry in ring.entries.iter() {
            let ts = entry.monotonic_ts_ms;
            if ts < window_start || ts > now_monotonic_ms {
                continue;
            }
            let Some(value) = entry.value.as_f64() else {
                return ReduceOutcome::TypeMismatch;
            };
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
            last = value;
        }
        if count == 0 {
            return match reduction {
                Reduction::Count => ReduceOutcome::Value { value: 0.0, partial },
                _ => ReduceOutcome::NoSamples,
            };
        }
        let value = match reduction {
            Reduction::Min => min,
            Reduction::Max => max,
            Reduction::Avg => sum / count as f64,
            Reduction::Count => count as f64,
            Reduction::Last => last,
            Reduction::PrevLast => 0.0, // handled above
        };
        ReduceOutcome::Value { value, partial }
    }

    /// Samples in `[from_ts, to_ts]` oldest-first, keeping the newest
    /// `max_samples` when more fall inside the range.
    pub fn collect_range(
        &self,
        signal_id: SignalId,
        from_ts: u64,
        to_ts: u64,
        max_samples: usize,
    ) -> Vec<(u64, u64, SignalValue)> {
        let Some(ring) = self.rings.get(&signal_id) else { return Vec::new() };
        let mut out: Vec<(u64, u64, SignalValue)> = ring
            .entries
            .iter()
            .filter(|e| e.monotonic_ts_ms >= from_ts && e.monotonic_ts_ms <= to_ts)
            .map(|e| (e.monotonic_ts_ms, e.wall_ts_ms, e.value))
            .collect();
        if out.len() > max_samples {
            out.drain(..out.len() - max_samples);
        }
        out
    }

    pub fn signal_count(&self) -> usize {
        self.rings.len()
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
