// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk payload store with sidecar metadata and a global quota
//!
//! Layout under `<root>`:
//! ```text
//! <event_id>.bin    payload bytes, exactly as handed to the transport
//! <event_id>.json   per-payload metadata sidecar
//! index.json        aggregate index, rewritten atomically on change
//! ```
//! The store is single-writer by construction: only the sender task
//! touches it.

use crate::StoreError;
use canopy_core::{Counters, EventId, SyncId};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Sidecar metadata for one persisted payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadMeta {
    #[serde(rename = "type")]
    pub doc_type: SmolStr,
    pub filename: String,
    pub payload_size: u64,
    pub campaign_id: SyncId,
    pub event_id: EventId,
    pub priority: u32,
    pub compress: bool,
}

impl PayloadMeta {
    pub fn new(
        campaign_id: SyncId,
        event_id: EventId,
        payload_size: u64,
        priority: u32,
        compress: bool,
    ) -> Self {
        Self {
            doc_type: SmolStr::new_static("vehicle_data"),
            filename: format!("{}.bin", event_id),
            payload_size,
            campaign_id,
            event_id,
            priority,
            compress,
        }
    }
}

/// Persistent FIFO of payloads awaiting (re)transmission.
///
/// Entries are ordered by event ID, which is assigned monotonically at
/// trigger time, so oldest-first here means oldest-trigger-first.
pub struct PayloadStore {
    root: PathBuf,
    quota_bytes: u64,
    index: BTreeMap<EventId, PayloadMeta>,
    total_bytes: u64,
    counters: Counters,
}

impl PayloadStore {
    /// Open the store, creating the directory if needed and loading the
    /// index. Index entries whose payload file has gone missing are
    /// pruned; stray payload files without an index entry are removed.
    pub fn open(root: &Path, quota_bytes: u64, counters: Counters) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        let mut store = Self {
            root: root.to_path_buf(),
            quota_bytes,
            index: BTreeMap::new(),
            total_bytes: 0,
            counters,
        };
        store.load_index()?;
        Ok(store)
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn bin_path(&self, event_id: EventId) -> PathBuf {
        self.root.join(format!("{}.bin", event_id))
    }

    fn sidecar_path(&self, event_id: EventId) -> PathBuf {
        self.root.join(format!("{}.json", event_id))
    }

    fn load_index(&mut self) -> Result<(), StoreError> {
        let entries: Vec<PayloadMeta> = match std::fs::read(self.index_path()) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt payload index, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        for meta in entries {
            let bin = self.bin_path(meta.event_id);
            if bin.is_file() {
                self.total_bytes += meta.payload_size;
                self.index.insert(meta.event_id, meta);
            } else {
                tracing::warn!(event_id = %meta.event_id, "payload file missing, pruning index entry");
            }
        }

        // Drop payload files the index does not know about
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".bin") else { continue };
            let known = stem
                .parse::<u64>()
                .ok()
                .map(|id| self.index.contains_key(&EventId(id)))
                .unwrap_or(false);
            if !known {
                tracing::warn!(file = name, "unindexed payload file, removing");
                let _ = std::fs::remove_file(entry.path());
                let _ = std::fs::remove_file(entry.path().with_extension("json"));
            }
        }

        self.rewrite_index()
    }

    fn rewrite_index(&self) -> Result<(), StoreError> {
        let entries: Vec<&PayloadMeta> = self.index.values().collect();
        let bytes = serde_json::to_vec(&entries)?;
        let tmp = self.root.join("index.json.tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, self.index_path())?;
        Ok(())
    }

    /// Persist one payload. Evicts oldest entries to respect the quota;
    /// refuses with [`StoreError::MemoryFull`] when the payload cannot
    /// fit even in an empty store. Filesystem failures are retried once
    /// before giving up.
    pub fn store(&mut self, bytes: &[u8], meta: PayloadMeta) -> Result<(), StoreError> {
        if bytes.len() as u64 > self.quota_bytes {
            return Err(StoreError::MemoryFull);
        }
        while self.total_bytes + bytes.len() as u64 > self.quota_bytes {
            let Some(oldest) = self.index.keys().next().copied() else {
                return Err(StoreError::MemoryFull);
            };
            self.remove(oldest)?;
            self.counters.store_evictions.increment();
        }

        match self.store_inner(bytes, &meta) {
            Ok(()) => Ok(()),
            Err(StoreError::Filesystem(e)) => {
                tracing::warn!(event_id = %meta.event_id, error = %e, "payload write failed, retrying once");
                self.store_inner(bytes, &meta)
            }
            Err(e) => Err(e),
        }
    }

    fn store_inner(&mut self, bytes: &[u8], meta: &PayloadMeta) -> Result<(), StoreError> {
        let event_id = meta.event_id;
        self.index.insert(event_id, meta.clone());

        let result = (|| -> Result<(), StoreError> {
            let sidecar = serde_json::to_vec(meta)?;
            std::fs::write(self.sidecar_path(event_id), sidecar)?;
            let tmp = self.root.join(format!("{}.bin.tmp", event_id));
            std::fs::write(&tmp, bytes)?;
            std::fs::rename(&tmp, self.bin_path(event_id))?;
            self.rewrite_index()
        })();

        match result {
            Ok(()) => {
                self.total_bytes += meta.payload_size;
                Ok(())
            }
            Err(e) => {
                // Roll back the index entry so a failed write leaves no trace
                self.index.remove(&event_id);
                let _ = std::fs::remove_file(self.sidecar_path(event_id));
                let _ = std::fs::remove_file(self.bin_path(event_id));
                Err(e)
            }
        }
    }

    /// The oldest pending entry and its bytes, if any. Does not remove
    /// it; call [`PayloadStore::remove`] after a successful send.
    pub fn oldest(&self) -> Result<Option<(PayloadMeta, Vec<u8>)>, StoreError> {
        let Some((event_id, meta)) = self.index.iter().next() else {
            return Ok(None);
        };
        let bytes = std::fs::read(self.bin_path(*event_id))?;
        Ok(Some((meta.clone(), bytes)))
    }

    /// Remove one entry: both files and the index record.
    pub fn remove(&mut self, event_id: EventId) -> Result<(), StoreError> {
        if let Some(meta) = self.index.remove(&event_id) {
            self.total_bytes = self.total_bytes.saturating_sub(meta.payload_size);
            let _ = std::fs::remove_file(self.sidecar_path(event_id));
            std::fs::remove_file(self.bin_path(event_id))?;
            self.rewrite_index()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

#[cfg(test)]
#[path = "payloads_tests.rs"]
mod tests;
