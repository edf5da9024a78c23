// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! canopy-transport: cloud connectivity seam
//!
//! The [`Transport`] trait is the only thing that talks to the network.
//! Everything above it (sender queue, retry driver, wire encodings,
//! persisted re-send) is transport-agnostic and fully testable with the
//! fake in `test-support`.

mod quota;
mod retry;
mod sender;
mod transport;
mod wire;

pub use quota::{HeapQuota, HeapReservation};
pub use retry::{RetryDriver, RetryHandle, RetryStatus, Retryable};
pub use sender::{Sender, SenderConfig, SenderHandle};
pub use transport::{Transport, TransportError, TransportTopic};
pub use wire::{
    decode_command_request, encode_checkin, encode_command_response, encode_vehicle_data,
    CheckinMessage, CommandRequest, CommandResponseMessage, CommandStatus, VehicleDataMessage,
    WireError,
};

#[cfg(any(test, feature = "test-support"))]
pub use transport::fake::FakeTransport;
