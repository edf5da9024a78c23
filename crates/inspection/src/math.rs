// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in math custom functions
//!
//! Stateless helpers exposed to campaign expressions: `abs`, `min`,
//! `max`, `pow`, `log`, `ceil`, `floor`. Undefined arguments yield an
//! undefined result (not an error); wrong arity or non-numeric
//! arguments are a type mismatch; domain errors yield undefined.

use crate::custom::{CustomFunction, CustomFunctionRegistry, InvocationId};
use crate::eval::EvalErrorCode;
use canopy_core::InspectionValue;

type MathResult = (EvalErrorCode, InspectionValue);

fn ok(value: f64) -> MathResult {
    if value.is_finite() {
        (EvalErrorCode::Successful, InspectionValue::Number(value))
    } else {
        (EvalErrorCode::Successful, InspectionValue::Undefined)
    }
}

fn undefined() -> MathResult {
    (EvalErrorCode::Successful, InspectionValue::Undefined)
}

fn mismatch() -> MathResult {
    (EvalErrorCode::TypeMismatch, InspectionValue::Undefined)
}

/// Numeric views of the arguments; `None` on any non-numeric argument,
/// `Some(None)` entries for undefined ones.
fn numeric_args(args: &[InspectionValue]) -> Option<Vec<Option<f64>>> {
    args.iter()
        .map(|arg| match arg {
            InspectionValue::Undefined => Some(None),
            other => other.as_f64().map(Some),
        })
        .collect()
}

struct Abs;

impl CustomFunction for Abs {
    fn invoke(&mut self, _id: InvocationId, args: &[InspectionValue]) -> MathResult {
        if args.len() != 1 {
            return mismatch();
        }
        match numeric_args(args) {
            Some(values) => match values[0] {
                Some(v) => ok(v.abs()),
                None => undefined(),
            },
            None => mismatch(),
        }
    }
}

struct Min;

impl CustomFunction for Min {
    fn invoke(&mut self, _id: InvocationId, args: &[InspectionValue]) -> MathResult {
        fold_args(args, f64::INFINITY, f64::min)
    }
}

struct Max;

impl CustomFunction for Max {
    fn invoke(&mut self, _id: InvocationId, args: &[InspectionValue]) -> MathResult {
        fold_args(args, f64::NEG_INFINITY, f64::max)
    }
}

/// Shared shape of `min`/`max`: at least two numeric arguments, any
/// undefined argument makes the result undefined.
fn fold_args(args: &[InspectionValue], init: f64, fold: fn(f64, f64) -> f64) -> MathResult {
    if args.len() < 2 {
        return mismatch();
    }
    let Some(values) = numeric_args(args) else { return mismatch() };
    let mut acc = init;
    for value in values {
        match value {
            Some(v) => acc = fold(acc, v),
            None => return undefined(),
        }
    }
    ok(acc)
}

struct Pow;

impl CustomFunction for Pow {
    fn invoke(&mut self, _id: InvocationId, args: &[InspectionValue]) -> MathResult {
        if args.len() != 2 {
            return mismatch();
        }
        match numeric_args(args) {
            Some(values) => match (values[0], values[1]) {
                (Some(base), Some(exp)) => ok(base.powf(exp)),
                _ => undefined(),
            },
            None => mismatch(),
        }
    }
}

struct Log;

impl CustomFunction for Log {
    /// `log(base, num)` = log of `num` in base `base`
    fn invoke(&mut self, _id: InvocationId, args: &[InspectionValue]) -> MathResult {
        if args.len() != 2 {
            return mismatch();
        }
        match numeric_args(args) {
            Some(values) => match (values[0], values[1]) {
                (Some(base), Some(num)) => ok(num.ln() / base.ln()),
                _ => undefined(),
            },
            None => mismatch(),
        }
    }
}

struct Ceil;

impl CustomFunction for Ceil {
    fn invoke(&mut self, _id: InvocationId, args: &[InspectionValue]) -> MathResult {
        unary(args, f64::ceil)
    }
}

struct Floor;

impl CustomFunction for Floor {
    fn invoke(&mut self, _id: InvocationId, args: &[InspectionValue]) -> MathResult {
        unary(args, f64::floor)
    }
}

fn unary(args: &[InspectionValue], f: fn(f64) -> f64) -> MathResult {
    if args.len() != 1 {
        return mismatch();
    }
    match numeric_args(args) {
        Some(values) => match values[0] {
            Some(v) => ok(f(v)),
            None => undefined(),
        },
        None => mismatch(),
    }
}

/// Register the whole math family.
pub fn register_math_functions(registry: &mut CustomFunctionRegistry) {
    registry.register("abs", Box::new(Abs));
    registry.register("min", Box::new(Min));
    registry.register("max", Box::new(Max));
    registry.register("pow", Box::new(Pow));
    registry.register("log", Box::new(Log));
    registry.register("ceil", Box::new(Ceil));
    registry.register("floor", Box::new(Floor));
}

#[cfg(test)]
#[path = "math_tests.rs"]
mod tests;
