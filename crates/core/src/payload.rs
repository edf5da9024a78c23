// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggered collection payloads
//!
//! A payload is the materialized snapshot produced when a campaign
//! fires. It owns its data outright (strings are copied out of the
//! arena at assembly time) so it can cross thread and persistence
//! boundaries freely.

use crate::signal::SignalId;
use crate::sync_id::{EventId, SyncId};
use serde::{Deserialize, Serialize};

/// An owned collected value. Numerics are carried as f64 like the rest
/// of the evaluation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectedValue {
    Bool(bool),
    Number(f64),
    String(String),
}

/// One signal observation inside a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedSignal {
    pub signal_id: SignalId,
    pub wall_ts_ms: u64,
    pub value: CollectedValue,
}

/// The snapshot handed to the sender when a campaign fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub campaign_id: SyncId,
    pub event_id: EventId,
    pub trigger_wall_ts_ms: u64,
    pub priority: u32,
    pub compress: bool,
    pub persist: bool,
    pub signals: Vec<CollectedSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtcs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
}

impl Payload {
    /// Rough in-memory footprint, used for heap accounting.
    pub fn approx_size_bytes(&self) -> usize {
        let mut size = std::mem::size_of::<Payload>();
        for signal in &self.signals {
            size += std::mem::size_of::<CollectedSignal>();
            if let CollectedValue::String(s) = &signal.value {
                size += s.len();
            }
        }
        if let Some(dtcs) = &self.dtcs {
            size += dtcs.iter().map(|d| d.len()).sum::<usize>();
        }
        size
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
