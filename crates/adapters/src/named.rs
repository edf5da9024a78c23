// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name-based signal ingestion
//!
//! Source adapters that know signals by human-readable name (GPS
//! readers, custom functions, vendor bridges) push through this facade.
//! The active dictionary snapshot is captured per call; samples for
//! names the manifest does not bind are dropped with a trace line.

use canopy_campaign::DecoderDictionary;
use canopy_core::{Clock, DecodedValue, SourceTag};
use canopy_inspection::{DecodedSample, DistributorHandle};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct NamedSignalDataSource<C: Clock> {
    dictionary_rx: watch::Receiver<Option<Arc<DecoderDictionary>>>,
    distributor: DistributorHandle,
    clock: C,
}

impl<C: Clock> NamedSignalDataSource<C> {
    pub fn new(
        dictionary_rx: watch::Receiver<Option<Arc<DecoderDictionary>>>,
        distributor: DistributorHandle,
        clock: C,
    ) -> Self {
        Self { dictionary_rx, distributor, clock }
    }

    /// Push one decoded value under its signal name. A zero timestamp
    /// means "now". Returns whether the name resolved in the active
    /// dictionary.
    pub fn ingest_value(&self, wall_ts_ms: u64, name: &str, value: DecodedValue) -> bool {
        let dictionary = self.dictionary_rx.borrow().clone();
        let Some(sample) = self.resolve(dictionary.as_deref(), wall_ts_ms, name, value) else {
            return false;
        };
        self.distributor.push(sample);
        true
    }

    /// Push several values with one timestamp, atomically with respect
    /// to queue overflow ordering. Unresolvable names are skipped; the
    /// rest still go through. Returns how many were pushed.
    pub fn ingest_multiple<N: AsRef<str>>(
        &self,
        wall_ts_ms: u64,
        values: impl IntoIterator<Item = (N, DecodedValue)>,
    ) -> usize {
        let dictionary = self.dictionary_rx.borrow().clone();
        let samples: Vec<DecodedSample> = values
            .into_iter()
            .filter_map(|(name, value)| {
                self.resolve(dictionary.as_deref(), wall_ts_ms, name.as_ref(), value)
            })
            .collect();
        let count = samples.len();
        if count > 0 {
            self.distributor.push_all(samples);
        }
        count
    }

    /// Look up a name in the active dictionary, for callers that need
    /// the ID itself (e.g. condition-end hooks).
    pub fn named_signal_id(&self, name: &str) -> Option<canopy_core::SignalId> {
        self.dictionary_rx
            .borrow()
            .as_ref()
            .and_then(|d| d.named_signal(name))
            .map(|(id, _)| id)
    }

    fn resolve(
        &self,
        dictionary: Option<&DecoderDictionary>,
        wall_ts_ms: u64,
        name: &str,
        value: DecodedValue,
    ) -> Option<DecodedSample> {
        let Some((signal_id, signal_type)) = dictionary.and_then(|d| d.named_signal(name)) else {
            tracing::trace!(name, "named signal not in active dictionary, dropping");
            return None;
        };
        let wall_ts_ms = if wall_ts_ms == 0 { self.clock.epoch_ms() } else { wall_ts_ms };
        Some(DecodedSample {
            signal_id,
            signal_type,
            monotonic_ts_ms: self.clock.monotonic_ms(),
            wall_ts_ms,
            value,
            source: SourceTag::Named,
        })
    }
}

#[cfg(test)]
#[path = "named_tests.rs"]
mod tests;
