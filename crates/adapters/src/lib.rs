// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! canopy-adapters: source-adapter facades
//!
//! Concrete bus I/O lives outside the agent; these are the pieces
//! adapters build on: name-based ingestion against the active decoder
//! dictionary, and the CAN/OBD payload decoders driven by manifest
//! formats.

mod can;
mod named;
mod obd;

pub use can::decode_can_frame;
pub use named::NamedSignalDataSource;
pub use obd::decode_obd_response;

#[cfg(feature = "test-support")]
pub use canopy_command::FakeDispatcher;
#[cfg(feature = "test-support")]
pub use canopy_transport::FakeTransport;
