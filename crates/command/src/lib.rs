// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! canopy-command: remote actuator command execution
//!
//! Routes inbound command requests to the dispatcher registered for
//! the actuator name, tracks in-flight commands with an execution
//! timeout, and guarantees exactly one terminal response per command.

mod executor;

pub use executor::{
    reason, CommandExecutor, CommandHandle, Dispatcher, DispatcherStatus, ResponseSink,
    StatusSender,
};

#[cfg(any(test, feature = "test-support"))]
pub use executor::fake::FakeDispatcher;
