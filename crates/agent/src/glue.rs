// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport-facing glue
//!
//! Small adapters mapping the campaign and command crates' sink traits
//! onto the transport, plus a stand-in transport for running the
//! daemon without a broker.

use async_trait::async_trait;
use canopy_campaign::{CheckinFailure, CheckinSink};
use canopy_command::ResponseSink;
use canopy_core::SyncId;
use canopy_transport::{
    encode_checkin, encode_command_response, CheckinMessage, CommandResponseMessage, Transport,
    TransportTopic,
};

/// Check-ins ride the transport like everything else.
pub struct TransportCheckinSink<T: Transport> {
    transport: T,
}

impl<T: Transport> TransportCheckinSink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport> CheckinSink for TransportCheckinSink<T> {
    async fn send_checkin(
        &self,
        timestamp_ms_epoch: u64,
        document_ids: Vec<SyncId>,
    ) -> Result<(), CheckinFailure> {
        let message = CheckinMessage { timestamp_ms_epoch, document_ids };
        let bytes = encode_checkin(&message).map_err(|e| CheckinFailure(e.to_string()))?;
        self.transport
            .send(TransportTopic::Checkin, &bytes)
            .await
            .map_err(|e| CheckinFailure(e.to_string()))
    }
}

/// Terminal command responses are always attempted; a dead transport
/// is logged, never bubbled.
pub struct TransportResponseSink<T: Transport> {
    transport: T,
}

impl<T: Transport> TransportResponseSink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport> ResponseSink for TransportResponseSink<T> {
    async fn publish(&self, response: CommandResponseMessage) {
        let bytes = match encode_command_response(&response) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(command = %response.command_id, error = %e, "response encode failed");
                return;
            }
        };
        if let Err(e) = self.transport.send(TransportTopic::CommandResponse, &bytes).await {
            tracing::warn!(command = %response.command_id, error = %e, "response publish failed");
        }
    }
}

/// Transport that logs outbound traffic instead of sending it.
/// `canopyd` runs with this until an embedder links a real broker
/// client through the library API.
#[derive(Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send(
        &self,
        topic: TransportTopic,
        bytes: &[u8],
    ) -> Result<(), canopy_transport::TransportError> {
        tracing::info!(?topic, size = bytes.len(), "outbound message (log transport)");
        Ok(())
    }

    fn alive(&self) -> bool {
        true
    }
}
