// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sender queue and sender task
//!
//! Decouples capture from transport: the inspection engine submits
//! ready payloads through a bounded queue; a single sender task encodes,
//! chunks, optionally compresses, and ships them. Failures spill the
//! undelivered remainder of persist-flagged payloads to the on-disk
//! store, which is drained (re-chunked) on a timer while the transport
//! is alive; signals that already reached the transport are never
//! re-sent.

use crate::quota::HeapQuota;
use crate::transport::{Transport, TransportError, TransportTopic};
use crate::wire::{encode_vehicle_data, VehicleDataMessage};
use canopy_core::{AgentConfig, Counters, Payload};
use canopy_store::{PayloadMeta, PayloadStore, StoreError};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub queue_capacity: usize,
    pub block_timeout_ms: u64,
    pub max_send_size_bytes: usize,
    pub upload_retry_interval_ms: u64,
}

impl SenderConfig {
    pub fn from_agent(config: &AgentConfig) -> Self {
        Self {
            queue_capacity: config.sender_queue_capacity,
            block_timeout_ms: config.sender_block_timeout_ms,
            max_send_size_bytes: config.max_send_size_bytes,
            upload_retry_interval_ms: config.persistency_upload_retry_interval_ms,
        }
    }
}

/// Producer side of the sender queue.
#[derive(Clone)]
pub struct SenderHandle {
    tx: mpsc::Sender<Payload>,
    block_timeout: Duration,
    counters: Counters,
}

impl SenderHandle {
    /// Submit a payload, blocking up to the configured timeout when the
    /// queue is full. A payload that still does not fit is dropped and
    /// counted, never an error.
    pub async fn submit(&self, payload: Payload) {
        let event_id = payload.event_id;
        if let Err(e) = self.tx.send_timeout(payload, self.block_timeout).await {
            tracing::warn!(%event_id, error = %e, "sender queue full, dropping payload");
            self.counters.payloads_dropped.increment();
        }
    }
}

/// One encoded outbound frame and the index of its first signal within
/// the source payload.
struct Frame {
    bytes: Vec<u8>,
    signal_offset: usize,
}

/// The sender task. Owns the payload store; nothing else touches it.
pub struct Sender<T: Transport> {
    rx: mpsc::Receiver<Payload>,
    transport: T,
    store: PayloadStore,
    quota: HeapQuota,
    config: SenderConfig,
    counters: Counters,
}

impl<T: Transport> Sender<T> {
    pub fn new(
        transport: T,
        store: PayloadStore,
        quota: HeapQuota,
        config: SenderConfig,
        counters: Counters,
    ) -> (Self, SenderHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let handle = SenderHandle {
            tx,
            block_timeout: Duration::from_millis(config.block_timeout_ms),
            counters: counters.clone(),
        };
        (Self { rx, transport, store, quota, config, counters }, handle)
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let mut retry_tick =
            tokio::time::interval(Duration::from_millis(self.config.upload_retry_interval_ms.max(1)));
        retry_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                maybe = self.rx.recv() => match maybe {
                    Some(payload) => self.handle_payload(payload).await,
                    None => break,
                },
                _ = retry_tick.tick() => self.drain_store().await,
            }
        }
        self.flush_pending();
    }

    /// Persist whatever is still queued at shutdown so it survives the
    /// restart.
    fn flush_pending(&mut self) {
        while let Ok(payload) = self.rx.try_recv() {
            if payload.persist {
                self.persist_remainder(&payload, 0);
            }
        }
    }

    async fn handle_payload(&mut self, payload: Payload) {
        match self.send_frames(&payload).await {
            Ok(()) => {}
            Err(from_signal) => {
                if payload.persist {
                    self.persist_remainder(&payload, from_signal);
                } else {
                    tracing::debug!(event_id = %payload.event_id, "payload not persistent, dropping");
                    self.counters.payloads_dropped.increment();
                }
            }
        }
    }

    /// Encode, chunk, compress, and send every frame of one payload.
    /// On failure returns the index of the first signal that did NOT
    /// reach the transport; everything before it was delivered.
    async fn send_frames(&self, payload: &Payload) -> Result<(), usize> {
        for frame in self.frames_for(payload) {
            let bytes = self.maybe_compress(payload, frame.bytes);
            if let Err(e) = self.send_bytes(TransportTopic::VehicleData, &bytes).await {
                tracing::debug!(event_id = %payload.event_id, error = %e, "vehicle data send failed");
                self.counters.send_failures.increment();
                return Err(frame.signal_offset);
            }
        }
        Ok(())
    }

    /// Split into chunk messages when the whole encoding exceeds the
    /// send size threshold. Chunks share the event ID and carry a
    /// `chunk`/`chunk_count` pair.
    fn frames_for(&self, payload: &Payload) -> Vec<Frame> {
        let whole = VehicleDataMessage::whole(payload);
        let whole_bytes = match encode_vehicle_data(&whole) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(event_id = %payload.event_id, error = %e, "payload encode failed, dropping");
                self.counters.payloads_dropped.increment();
                return Vec::new();
            }
        };
        let max = self.config.max_send_size_bytes;
        if whole_bytes.len() <= max || payload.signals.len() <= 1 {
            return vec![Frame { bytes: whole_bytes, signal_offset: 0 }];
        }
        let desired = whole_bytes.len().div_ceil(max).min(payload.signals.len());
        let per_chunk = payload.signals.len().div_ceil(desired);
        // Recompute so the advertised count matches the frames produced
        let chunk_count = payload.signals.len().div_ceil(per_chunk);
        let mut frames = Vec::with_capacity(chunk_count);
        for (index, signals) in payload.signals.chunks(per_chunk).enumerate() {
            let message = VehicleDataMessage {
                campaign_id: payload.campaign_id.clone(),
                event_id: payload.event_id,
                trigger_wall_ts_ms: payload.trigger_wall_ts_ms,
                chunk: index as u32,
                chunk_count: chunk_count as u32,
                signals: signals.to_vec(),
                // DTCs and attachments ride on the first chunk only
                dtcs: if index == 0 { payload.dtcs.clone() } else { None },
                attachments: if index == 0 { payload.attachments.clone() } else { None },
            };
            match encode_vehicle_data(&message) {
                Ok(bytes) => frames.push(Frame { bytes, signal_offset: index * per_chunk }),
                Err(e) => {
                    tracing::warn!(event_id = %payload.event_id, error = %e, "chunk encode failed");
                }
            }
        }
        frames
    }

    fn maybe_compress(&self, payload: &Payload, bytes: Vec<u8>) -> Vec<u8> {
        if !payload.compress {
            return bytes;
        }
        match zstd::stream::encode_all(bytes.as_slice(), 0) {
            Ok(compressed) => compressed,
            Err(e) => {
                tracing::warn!(event_id = %payload.event_id, error = %e, "compression failed, sending raw");
                bytes
            }
        }
    }

    /// Persist the undelivered tail of a payload starting at
    /// `from_signal`. Chunks before that index already reached the
    /// transport, so only the remainder may ever be re-sent.
    fn persist_remainder(&mut self, payload: &Payload, from_signal: usize) {
        let mut remainder = payload.clone();
        if from_signal > 0 {
            remainder.signals = remainder.signals.split_off(from_signal);
            // The first chunk carried these and it was delivered
            remainder.dtcs = None;
            remainder.attachments = None;
        }
        match self.encode_for_store(&remainder) {
            Ok((bytes, meta)) => self.persist(&bytes, meta),
            Err(e) => {
                tracing::warn!(event_id = %payload.event_id, error = %e, "encode for store failed");
            }
        }
    }

    /// What goes on disk: one whole-payload encoding of the undelivered
    /// signals, with the campaign's compression applied. Drain decodes
    /// it and re-sends under the same chunking bound.
    fn encode_for_store(&self, payload: &Payload) -> Result<(Vec<u8>, PayloadMeta), crate::wire::WireError> {
        let whole = VehicleDataMessage::whole(payload);
        let bytes = self.maybe_compress(payload, encode_vehicle_data(&whole)?);
        let meta = PayloadMeta::new(
            payload.campaign_id.clone(),
            payload.event_id,
            bytes.len() as u64,
            payload.priority,
            payload.compress,
        );
        Ok((bytes, meta))
    }

    /// Reverse of `encode_for_store`: decompress and decode a stored
    /// entry back into a payload so drain can re-send it chunked.
    fn decode_stored(&self, meta: &PayloadMeta, bytes: &[u8]) -> Option<Payload> {
        let plain = if meta.compress {
            match zstd::stream::decode_all(bytes) {
                Ok(plain) => plain,
                Err(e) => {
                    tracing::warn!(event_id = %meta.event_id, error = %e, "stored payload decompress failed");
                    return None;
                }
            }
        } else {
            bytes.to_vec()
        };
        let message: VehicleDataMessage = match serde_json::from_slice(&plain) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(event_id = %meta.event_id, error = %e, "stored payload decode failed");
                return None;
            }
        };
        Some(Payload {
            campaign_id: message.campaign_id,
            event_id: message.event_id,
            trigger_wall_ts_ms: message.trigger_wall_ts_ms,
            priority: meta.priority,
            compress: meta.compress,
            persist: true,
            signals: message.signals,
            dtcs: message.dtcs,
            attachments: message.attachments,
        })
    }

    fn persist(&mut self, bytes: &[u8], meta: PayloadMeta) {
        let event_id = meta.event_id;
        match self.store.store(bytes, meta) {
            Ok(()) => {
                tracing::info!(%event_id, size = bytes.len(), "payload persisted");
                self.counters.payloads_persisted.increment();
            }
            Err(StoreError::MemoryFull) => {
                tracing::warn!(%event_id, "payload store full, dropping payload");
                self.counters.payloads_dropped.increment();
            }
            Err(e) => {
                tracing::warn!(%event_id, error = %e, "payload persist failed");
                self.counters.persist_failures.increment();
            }
        }
    }

    /// Re-send persisted payloads oldest-first while the transport is
    /// alive, re-chunked so stored entries never bypass the send size
    /// threshold; the first failure stops the pass.
    async fn drain_store(&mut self) {
        if !self.transport.alive() {
            return;
        }
        loop {
            let (meta, bytes) = match self.store.oldest() {
                Ok(Some(entry)) => entry,
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "payload store read failed");
                    self.counters.persist_failures.increment();
                    return;
                }
            };
            let Some(payload) = self.decode_stored(&meta, &bytes) else {
                // Unreadable entries would wedge the drain forever
                self.counters.persist_failures.increment();
                if self.store.remove(meta.event_id).is_err() {
                    return;
                }
                continue;
            };
            match self.send_frames(&payload).await {
                Ok(()) => {
                    if let Err(e) = self.store.remove(meta.event_id) {
                        tracing::warn!(event_id = %meta.event_id, error = %e, "persisted payload cleanup failed");
                        self.counters.persist_failures.increment();
                        return;
                    }
                    tracing::info!(event_id = %meta.event_id, "persisted payload delivered");
                }
                Err(from_signal) => {
                    tracing::debug!(event_id = %meta.event_id, "persisted payload re-send failed");
                    if from_signal > 0 {
                        // Part of the entry was delivered: shrink it to
                        // the undelivered tail so nothing repeats
                        if self.store.remove(meta.event_id).is_ok() {
                            self.persist_remainder(&payload, from_signal);
                        }
                    }
                    return;
                }
            }
        }
    }

    async fn send_bytes(&self, topic: TransportTopic, bytes: &[u8]) -> Result<(), TransportError> {
        let _reservation = self.quota.reserve(bytes.len())?;
        self.transport.send(topic, bytes).await
    }
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
