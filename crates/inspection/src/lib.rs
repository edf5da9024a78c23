// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! canopy-inspection: the collection/inspection engine
//!
//! Owns the signal history buffer and the per-campaign runtime state,
//! evaluates trigger conditions over buffered signals, and hands fired
//! payloads to the sender. Everything here runs on the single evaluator
//! task; nothing blocks and nothing does I/O during evaluation.

mod arena;
mod assembler;
mod custom;
mod distributor;
mod engine;
mod eval;
mod history;
mod math;

pub use arena::StringArena;
pub use assembler::assemble;
pub use custom::{
    CustomFunction, CustomFunctionRegistry, CycleOutput, InvocationId,
};
pub use distributor::{DecodedSample, DistributorHandle, SignalBufferDistributor};
pub use engine::{EngineConfig, InspectionEngine};
pub use eval::{evaluate, EvalContext, EvalErrorCode, EvalResult};
pub use history::{ReduceOutcome, Reduction, SignalHistoryBuffer};
pub use math::register_math_functions;
