// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transport seam

use async_trait::async_trait;
use thiserror::Error;

/// Logical destination of an outbound message. The concrete transport
/// maps these to topics or endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportTopic {
    VehicleData,
    Checkin,
    CommandResponse,
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// Not connected; the payload may be persisted and retried
    #[error("transport unavailable")]
    Unavailable,
    /// In-flight memory ceiling reached
    #[error("transport memory quota reached")]
    QuotaReached,
    /// The broker accepted the connection but refused the message
    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Asynchronous message sink towards the cloud.
///
/// Implementations must be cheap to clone and safe to call from
/// multiple tasks; the sender task is the only caller for vehicle
/// data, but check-ins and command responses arrive from their own
/// tasks.
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    async fn send(&self, topic: TransportTopic, bytes: &[u8]) -> Result<(), TransportError>;

    /// Whether the underlying connection is currently established.
    /// Drives persisted-payload re-send; a pessimistic `false` only
    /// delays retries.
    fn alive(&self) -> bool;

    /// (Re)establish the connection. Driven by the agent's retry
    /// supervisor with exponential backoff; transports without an
    /// explicit connect step keep the default.
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::{Transport, TransportError, TransportTopic};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Recorded outbound message
    #[derive(Debug, Clone)]
    pub struct SentMessage {
        pub topic: TransportTopic,
        pub bytes: Vec<u8>,
    }

    struct FakeTransportState {
        sent: Vec<SentMessage>,
        connect_attempts: usize,
    }

    /// Fake transport recording every send; can be switched offline.
    #[derive(Clone)]
    pub struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
        online: Arc<AtomicBool>,
    }

    impl Default for FakeTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeTransportState {
                    sent: Vec::new(),
                    connect_attempts: 0,
                })),
                online: Arc::new(AtomicBool::new(true)),
            }
        }

        pub fn connect_attempts(&self) -> usize {
            self.state.lock().connect_attempts
        }

        pub fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }

        pub fn sent(&self) -> Vec<SentMessage> {
            self.state.lock().sent.clone()
        }

        pub fn sent_on(&self, topic: TransportTopic) -> Vec<Vec<u8>> {
            self.state
                .lock()
                .sent
                .iter()
                .filter(|m| m.topic == topic)
                .map(|m| m.bytes.clone())
                .collect()
        }

        pub fn clear(&self) {
            self.state.lock().sent.clear();
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, topic: TransportTopic, bytes: &[u8]) -> Result<(), TransportError> {
            if !self.online.load(Ordering::SeqCst) {
                return Err(TransportError::Unavailable);
            }
            self.state.lock().sent.push(SentMessage { topic, bytes: bytes.to_vec() });
            Ok(())
        }

        fn alive(&self) -> bool {
            self.online.load(Ordering::SeqCst)
        }

        async fn connect(&self) -> Result<(), TransportError> {
            self.state.lock().connect_attempts += 1;
            if self.online.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(TransportError::Unavailable)
            }
        }
    }
}
