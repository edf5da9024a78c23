// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression evaluator
//!
//! Pure and re-entrant: reads the history buffer, never mutates it,
//! never does I/O, never fails. Every problem becomes
//! `(Undefined, code)` so a bad expression can only ever suppress a
//! trigger, not take down the engine.

use crate::custom::{CustomFunctionRegistry, InvocationId};
use crate::history::{ReduceOutcome, Reduction, SignalHistoryBuffer};
use canopy_core::{
    BinaryOp, ExpressionNode, ExpressionTree, InspectionValue, NodeIdx, SignalValue, UnaryOp,
    WindowFunction,
};
use std::collections::HashMap;

/// Evaluation recursion limit. Trees are validated as forward-only at
/// ingestion, so depth is bounded by node count; this guards the stack
/// against pathological chains.
const MAX_DEPTH: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorCode {
    Successful,
    NumericError,
    TypeMismatch,
    UndefinedValue,
    NotImplemented,
    StackDepthExceeded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    pub value: InspectionValue,
    pub code: EvalErrorCode,
}

impl EvalResult {
    pub fn ok(value: InspectionValue) -> Self {
        Self { value, code: EvalErrorCode::Successful }
    }

    pub fn undefined(code: EvalErrorCode) -> Self {
        Self { value: InspectionValue::Undefined, code }
    }

    /// Boolean view with the engine's coercion: `Undefined` is false.
    pub fn as_bool(&self) -> bool {
        self.value.as_bool().unwrap_or(false)
    }
}

/// Everything one evaluation may read.
pub struct EvalContext<'a> {
    pub buffer: &'a SignalHistoryBuffer,
    pub registry: &'a mut CustomFunctionRegistry,
    /// Stable invocation IDs for custom-function nodes of the tree
    /// being evaluated, keyed by node index. Nodes without an entry
    /// fall back to their index, which keeps standalone evaluation
    /// (tests, fetch trees) deterministic too.
    pub invocations: Option<&'a HashMap<u16, InvocationId>>,
    pub now_monotonic_ms: u64,
    pub now_epoch_ms: u64,
}

pub fn evaluate(tree: &ExpressionTree, ctx: &mut EvalContext<'_>) -> EvalResult {
    eval_node(tree, NodeIdx::ROOT, ctx, 0)
}

fn eval_node(
    tree: &ExpressionTree,
    idx: NodeIdx,
    ctx: &mut EvalContext<'_>,
    depth: u32,
) -> EvalResult {
    if depth >= MAX_DEPTH {
        return EvalResult::undefined(EvalErrorCode::StackDepthExceeded);
    }
    let Some(node) = tree.get(idx.index()) else {
        return EvalResult::undefined(EvalErrorCode::UndefinedValue);
    };
    match node {
        ExpressionNode::Constant { value } => EvalResult::ok(value.clone()),

        ExpressionNode::SignalRef { signal_id } => match ctx.buffer.latest(*signal_id) {
            Some((_, _, value)) => signal_to_inspection(value, ctx),
            None => EvalResult::undefined(EvalErrorCode::UndefinedValue),
        },

        ExpressionNode::LastReceptionTime { signal_id } => match ctx.buffer.latest(*signal_id) {
            Some((_, wall_ts, _)) => EvalResult::ok(InspectionValue::Number(wall_ts as f64)),
            None => EvalResult::undefined(EvalErrorCode::UndefinedValue),
        },

        ExpressionNode::Window { signal_id, function, window_ms } => {
            let reduction = match function {
                WindowFunction::Min => Reduction::Min,
                WindowFunction::Max => Reduction::Max,
                WindowFunction::Avg => Reduction::Avg,
                WindowFunction::Last => Reduction::Last,
                WindowFunction::PrevLast => Reduction::PrevLast,
            };
            match ctx.buffer.reduce(*signal_id, ctx.now_monotonic_ms, *window_ms, reduction) {
                // Partial results are defined values; prev_last over an
                // empty prior window comes back as NoSamples
                ReduceOutcome::Value { value, .. } => EvalResult::ok(InspectionValue::Number(value)),
                ReduceOutcome::TypeMismatch => EvalResult::undefined(EvalErrorCode::TypeMismatch),
                ReduceOutcome::NoSamples => EvalResult::undefined(EvalErrorCode::UndefinedValue),
            }
        }

        ExpressionNode::IsNull { signal_id } => {
            EvalResult::ok(InspectionValue::Bool(!ctx.buffer.has_seen(*signal_id)))
        }

        ExpressionNode::Unary { op, child } => {
            let child = eval_node(tree, *child, ctx, depth + 1);
            match op {
                UnaryOp::Not => match child.value.as_bool() {
                    Some(b) => EvalResult::ok(InspectionValue::Bool(!b)),
                    None => propagate(child, EvalErrorCode::TypeMismatch),
                },
                UnaryOp::Neg => match child.value.as_f64() {
                    Some(n) => EvalResult::ok(InspectionValue::Number(-n)),
                    None => propagate(child, EvalErrorCode::TypeMismatch),
                },
            }
        }

        ExpressionNode::Binary { op, left, right } => {
            if op.is_boolean() {
                eval_boolean(tree, *op, *left, *right, ctx, depth)
            } else {
                let lhs = eval_node(tree, *left, ctx, depth + 1);
                let rhs = eval_node(tree, *right, ctx, depth + 1);
                eval_binary(*op, lhs, rhs)
            }
        }

        ExpressionNode::CustomFunction { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                // Undefined arguments are passed through; functions
                // decide their own undefined propagation
                values.push(eval_node(tree, *arg, ctx, depth + 1).value);
            }
            let invocation_id = ctx
                .invocations
                .and_then(|map| map.get(&idx.0).copied())
                .unwrap_or(idx.0 as InvocationId);
            let (code, value) = ctx.registry.invoke(name, invocation_id, &values);
            if code == EvalErrorCode::Successful {
                EvalResult::ok(value)
            } else {
                EvalResult::undefined(code)
            }
        }
    }
}

/// Short-circuiting `&&` / `||`. The right child is not evaluated when
/// the left child alone determines the result; an `Undefined` operand
/// is absorbed when the other operand determines the result.
fn eval_boolean(
    tree: &ExpressionTree,
    op: BinaryOp,
    left: NodeIdx,
    right: NodeIdx,
    ctx: &mut EvalContext<'_>,
    depth: u32,
) -> EvalResult {
    let lhs = eval_node(tree, left, ctx, depth + 1);
    if matches!(lhs.value, InspectionValue::String(_)) {
        return EvalResult::undefined(EvalErrorCode::TypeMismatch);
    }
    let lhs_bool = lhs.value.as_bool();
    match (op, lhs_bool) {
        (BinaryOp::And, Some(false)) => return EvalResult::ok(InspectionValue::Bool(false)),
        (BinaryOp::Or, Some(true)) => return EvalResult::ok(InspectionValue::Bool(true)),
        _ => {}
    }

    let rhs = eval_node(tree, right, ctx, depth + 1);
    if matches!(rhs.value, InspectionValue::String(_)) {
        return EvalResult::undefined(EvalErrorCode::TypeMismatch);
    }
    let rhs_bool = rhs.value.as_bool();
    match (op, rhs_bool) {
        // The right operand can determine the result even when the
        // left was undefined
        (BinaryOp::And, Some(false)) => EvalResult::ok(InspectionValue::Bool(false)),
        (BinaryOp::Or, Some(true)) => EvalResult::ok(InspectionValue::Bool(true)),
        _ => match (lhs_bool, rhs_bool) {
            (Some(l), Some(r)) => EvalResult::ok(InspectionValue::Bool(match op {
                BinaryOp::And => l && r,
                BinaryOp::Or => l || r,
                _ => unreachable_bool(),
            })),
            _ => EvalResult::undefined(first_error(&lhs, &rhs)),
        },
    }
}

fn eval_binary(op: BinaryOp, lhs: EvalResult, rhs: EvalResult) -> EvalResult {
    use InspectionValue as V;

    // String equality is the one string-typed operation
    if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
        match (&lhs.value, &rhs.value) {
            (V::String(a), V::String(b)) => {
                let equal = a == b;
                return EvalResult::ok(V::Bool(if op == BinaryOp::Eq { equal } else { !equal }));
            }
            (V::String(_), V::Undefined) | (V::Undefined, V::String(_)) => {
                return EvalResult::undefined(first_error(&lhs, &rhs));
            }
            (V::String(_), _) | (_, V::String(_)) => {
                return EvalResult::undefined(EvalErrorCode::TypeMismatch);
            }
            _ => {}
        }
    } else if matches!(&lhs.value, V::String(_)) || matches!(&rhs.value, V::String(_)) {
        return EvalResult::undefined(EvalErrorCode::TypeMismatch);
    }

    let (Some(l), Some(r)) = (lhs.value.as_f64(), rhs.value.as_f64()) else {
        return EvalResult::undefined(first_error(&lhs, &rhs));
    };

    let value = match op {
        BinaryOp::Add => V::Number(l + r),
        BinaryOp::Sub => V::Number(l - r),
        BinaryOp::Mul => V::Number(l * r),
        BinaryOp::Div => {
            if r == 0.0 {
                return EvalResult::undefined(EvalErrorCode::NumericError);
            }
            V::Number(l / r)
        }
        BinaryOp::Eq => V::Bool(l == r),
        BinaryOp::Ne => V::Bool(l != r),
        BinaryOp::Lt => V::Bool(l < r),
        BinaryOp::Le => V::Bool(l <= r),
        BinaryOp::Gt => V::Bool(l > r),
        BinaryOp::Ge => V::Bool(l >= r),
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            if l.fract() != 0.0 || r.fract() != 0.0 {
                return EvalResult::undefined(EvalErrorCode::TypeMismatch);
            }
            let (li, ri) = (l as i64, r as i64);
            let out = match op {
                BinaryOp::BitAnd => li & ri,
                BinaryOp::BitOr => li | ri,
                BinaryOp::BitXor => li ^ ri,
                _ => unreachable_i64(),
            };
            V::Number(out as f64)
        }
        BinaryOp::And | BinaryOp::Or => return EvalResult::undefined(EvalErrorCode::TypeMismatch),
    };
    EvalResult::ok(value)
}

fn signal_to_inspection(value: SignalValue, ctx: &EvalContext<'_>) -> EvalResult {
    match value {
        SignalValue::Bool(b) => EvalResult::ok(InspectionValue::Bool(b)),
        SignalValue::String(handle) => match ctx.buffer.resolve(handle) {
            Some(s) => EvalResult::ok(InspectionValue::String(s.to_string())),
            None => EvalResult::undefined(EvalErrorCode::UndefinedValue),
        },
        other => match other.as_f64() {
            Some(n) => EvalResult::ok(InspectionValue::Number(n)),
            None => EvalResult::undefined(EvalErrorCode::TypeMismatch),
        },
    }
}

/// The propagated code when combining two child results: the first
/// non-successful child code wins, else `UndefinedValue`.
fn first_error(lhs: &EvalResult, rhs: &EvalResult) -> EvalErrorCode {
    if lhs.code != EvalErrorCode::Successful {
        lhs.code
    } else if rhs.code != EvalErrorCode::Successful {
        rhs.code
    } else {
        EvalErrorCode::UndefinedValue
    }
}

fn propagate(child: EvalResult, fallback: EvalErrorCode) -> EvalResult {
    if child.code != EvalErrorCode::Successful {
        EvalResult::undefined(child.code)
    } else {
        EvalResult::undefined(fallback)
    }
}

// These arms are statically unreachable; the match shapes above only
// route boolean ops to eval_boolean and bitwise ops to the i64 block.
fn unreachable_bool() -> bool {
    debug_assert!(false, "non-boolean op routed to eval_boolean");
    false
}

fn unreachable_i64() -> i64 {
    debug_assert!(false, "non-bitwise op in bitwise arm");
    0
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
