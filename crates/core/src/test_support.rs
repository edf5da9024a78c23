// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for other crates' tests

use crate::expr::{BinaryOp, ExpressionNode, ExpressionTree, InspectionValue, NodeIdx};
use crate::sample::{Sample, SourceTag};
use crate::signal::SignalId;
use crate::value::SignalValue;

/// `signal <op> constant` as a three-node tree
pub fn threshold_tree(signal_id: SignalId, op: BinaryOp, constant: f64) -> ExpressionTree {
    vec![
        ExpressionNode::Binary { op, left: NodeIdx(1), right: NodeIdx(2) },
        ExpressionNode::SignalRef { signal_id },
        ExpressionNode::Constant { value: InspectionValue::Number(constant) },
    ]
}

/// A tree that is just `true`
pub fn always_true_tree() -> ExpressionTree {
    vec![ExpressionNode::Constant { value: InspectionValue::Bool(true) }]
}

/// F64 sample with identical monotonic and wall timestamps
pub fn f64_sample(signal_id: SignalId, ts_ms: u64, value: f64) -> Sample {
    Sample::new(signal_id, ts_ms, ts_ms, SignalValue::F64(value), SourceTag::Named)
}

/// U16 sample with identical monotonic and wall timestamps
pub fn u16_sample(signal_id: SignalId, ts_ms: u64, value: u16) -> Sample {
    Sample::new(signal_id, ts_ms, ts_ms, SignalValue::U16(value), SourceTag::Can)
}
