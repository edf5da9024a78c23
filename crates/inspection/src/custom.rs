// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom function registry
//!
//! Named functions callable from expressions. A call site is identified
//! by its invocation ID, stable across re-evaluations, so functions can
//! keep per-site state (counters, rolling aggregates). The engine calls
//! `cleanup` once per site when its campaign leaves the active set.

use crate::eval::EvalErrorCode;
use canopy_core::{InspectionValue, Payload, SignalId, SyncId};
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Stable identifier of one custom-function call site.
pub type InvocationId = u64;

/// What `condition_end` hooks may append to: the payloads assembled in
/// the current evaluation cycle.
pub struct CycleOutput {
    pub payloads: Vec<Payload>,
}

/// A named function callable from campaign expressions.
pub trait CustomFunction: Send {
    fn invoke(
        &mut self,
        invocation_id: InvocationId,
        args: &[InspectionValue],
    ) -> (EvalErrorCode, InspectionValue);

    /// Called once per call site after every campaign was processed in
    /// a cycle, with the set of signal IDs that made it into payloads.
    /// Hooks may push additional signals into the cycle's payloads.
    fn condition_end(
        &mut self,
        _invocation_id: InvocationId,
        _collected_signal_ids: &HashSet<SignalId>,
        _timestamp_ms: u64,
        _output: &mut CycleOutput,
    ) {
    }

    /// Called at most once per invocation ID, after its last `invoke`.
    fn cleanup(&mut self, _invocation_id: InvocationId) {}
}

#[derive(Default)]
pub struct CustomFunctionRegistry {
    functions: HashMap<SmolStr, Box<dyn CustomFunction>>,
}

impl CustomFunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under a name; a second registration replaces the first.
    pub fn register(&mut self, name: impl Into<SmolStr>, function: Box<dyn CustomFunction>) {
        let name = name.into();
        if self.functions.insert(name.clone(), function).is_some() {
            tracing::warn!(%name, "custom function re-registered");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn invoke(
        &mut self,
        name: &str,
        invocation_id: InvocationId,
        args: &[InspectionValue],
    ) -> (EvalErrorCode, InspectionValue) {
        match self.functions.get_mut(name) {
            Some(function) => function.invoke(invocation_id, args),
            None => (EvalErrorCode::NotImplemented, InspectionValue::Undefined),
        }
    }

    pub fn condition_end(
        &mut self,
        name: &str,
        invocation_id: InvocationId,
        collected_signal_ids: &HashSet<SignalId>,
        timestamp_ms: u64,
        output: &mut CycleOutput,
    ) {
        if let Some(function) = self.functions.get_mut(name) {
            function.condition_end(invocation_id, collected_signal_ids, timestamp_ms, output);
        }
    }

    pub fn cleanup(&mut self, name: &str, invocation_id: InvocationId) {
        if let Some(function) = self.functions.get_mut(name) {
            function.cleanup(invocation_id);
        }
    }
}

/// Derive the invocation ID for a call site. Deterministic for the
/// same `(campaign, tree, node)` triple within and across evaluations;
/// trees of one campaign are numbered so call sites never collide.
pub fn invocation_id(campaign_id: &SyncId, tree_ordinal: u32, node_index: u16) -> InvocationId {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    campaign_id.as_str().hash(&mut hasher);
    tree_ordinal.hash(&mut hasher);
    node_index.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
#[path = "custom_tests.rs"]
mod tests;
