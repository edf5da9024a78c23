// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! canopy-core: shared types for the Canopy vehicle edge agent

pub mod clock;
pub mod config;
pub mod counters;
pub mod expr;
pub mod payload;
pub mod sample;
pub mod signal;
pub mod sync_id;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{AgentConfig, ConfigError, LogLevel};
pub use counters::{Counter, Counters};
pub use expr::{
    referenced_signals, validate_tree, BinaryOp, ExpressionNode, ExpressionTree, InspectionValue,
    NodeIdx, TreeError, UnaryOp, WindowFunction,
};
pub use payload::{CollectedSignal, CollectedValue, Payload};
pub use sample::{Sample, SourceTag};
pub use signal::{SignalId, SignalType};
pub use sync_id::{EventId, EventIdGenerator, SyncId};
pub use value::{DecodedValue, SignalValue, StringHandle};
