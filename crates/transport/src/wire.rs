// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound and inbound wire formats
//!
//! JSON over the transport. The payload chunking applied by the sender
//! is visible here as `chunk`/`chunk_count` on vehicle data messages.

use canopy_core::{CollectedSignal, DecodedValue, EventId, Payload, SyncId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One (possibly chunked) vehicle data message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDataMessage {
    pub campaign_id: SyncId,
    pub event_id: EventId,
    pub trigger_wall_ts_ms: u64,
    pub chunk: u32,
    pub chunk_count: u32,
    pub signals: Vec<CollectedSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtcs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
}

impl VehicleDataMessage {
    /// Single-chunk message covering the whole payload.
    pub fn whole(payload: &Payload) -> Self {
        Self {
            campaign_id: payload.campaign_id.clone(),
            event_id: payload.event_id,
            trigger_wall_ts_ms: payload.trigger_wall_ts_ms,
            chunk: 0,
            chunk_count: 1,
            signals: payload.signals.clone(),
            dtcs: payload.dtcs.clone(),
            attachments: payload.attachments.clone(),
        }
    }
}

/// Periodic check-in listing every known document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinMessage {
    pub timestamp_ms_epoch: u64,
    pub document_ids: Vec<SyncId>,
}

/// Terminal status of an actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Succeeded,
    Failed,
    TimedOut,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponseMessage {
    pub command_id: String,
    pub status: CommandStatus,
    pub reason_code: u32,
    pub reason_description: String,
}

/// Inbound actuator command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command_id: String,
    pub signal_name: String,
    pub value: DecodedValue,
    pub issued_ts_ms: u64,
    /// 0 disables the timeout
    #[serde(default)]
    pub execution_timeout_ms: u64,
}

pub fn encode_vehicle_data(message: &VehicleDataMessage) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(message).map_err(WireError::Encode)
}

pub fn encode_checkin(message: &CheckinMessage) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(message).map_err(WireError::Encode)
}

pub fn encode_command_response(message: &CommandResponseMessage) -> Result<Vec<u8>, WireError> {
    serde_json::to_vec(message).map_err(WireError::Encode)
}

pub fn decode_command_request(bytes: &[u8]) -> Result<CommandRequest, WireError> {
    serde_json::from_slice(bytes).map_err(WireError::Decode)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
