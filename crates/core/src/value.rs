// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoded signal values

use crate::signal::SignalType;
use serde::{Deserialize, Serialize};

/// Handle into the string arena owned by the inspection engine.
///
/// The handle itself carries no lifetime; validity is governed by the
/// arena's reference counts. Anything that stores a handle must retain
/// it and release it when done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringHandle(pub u32);

/// A decoded value as stored in the signal history buffer.
///
/// The variant always matches the [`SignalType`] the signal is bound to
/// in the active decoder dictionary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(StringHandle),
}

impl SignalValue {
    pub fn signal_type(&self) -> SignalType {
        match self {
            SignalValue::U8(_) => SignalType::U8,
            SignalValue::I8(_) => SignalType::I8,
            SignalValue::U16(_) => SignalType::U16,
            SignalValue::I16(_) => SignalType::I16,
            SignalValue::U32(_) => SignalType::U32,
            SignalValue::I32(_) => SignalType::I32,
            SignalValue::U64(_) => SignalType::U64,
            SignalValue::I64(_) => SignalType::I64,
            SignalValue::F32(_) => SignalType::F32,
            SignalValue::F64(_) => SignalType::F64,
            SignalValue::Bool(_) => SignalType::Bool,
            SignalValue::String(_) => SignalType::String,
        }
    }

    /// Numeric lift used by the expression evaluator. Booleans become
    /// 0.0/1.0; strings have no numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            SignalValue::U8(v) => Some(v as f64),
            SignalValue::I8(v) => Some(v as f64),
            SignalValue::U16(v) => Some(v as f64),
            SignalValue::I16(v) => Some(v as f64),
            SignalValue::U32(v) => Some(v as f64),
            SignalValue::I32(v) => Some(v as f64),
            SignalValue::U64(v) => Some(v as f64),
            SignalValue::I64(v) => Some(v as f64),
            SignalValue::F32(v) => Some(v as f64),
            SignalValue::F64(v) => Some(v),
            SignalValue::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            SignalValue::String(_) => None,
        }
    }

    pub fn as_string_handle(&self) -> Option<StringHandle> {
        match self {
            SignalValue::String(h) => Some(*h),
            _ => None,
        }
    }
}

/// A value as produced by a source adapter, before it is typed against
/// the decoder dictionary. Also the value shape carried by actuator
/// command requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Double(f64),
    String(String),
}

impl DecodedValue {
    /// Convert to the buffer representation for the dictionary type.
    ///
    /// Numeric conversions saturate at the target range. Returns `None`
    /// on a kind mismatch (string value for a numeric signal or vice
    /// versa); string conversion is handled by the caller because it
    /// needs the arena.
    pub fn into_typed(self, ty: SignalType) -> Option<SignalValue> {
        let value = match self {
            DecodedValue::Double(v) => v,
            DecodedValue::Unsigned(v) => v as f64,
            DecodedValue::Signed(v) => v as f64,
            DecodedValue::Bool(v) => {
                return match ty {
                    SignalType::Bool => Some(SignalValue::Bool(v)),
                    _ => DecodedValue::Double(if v { 1.0 } else { 0.0 }).into_typed(ty),
                };
            }
            DecodedValue::String(_) => return None,
        };
        Some(match ty {
            SignalType::U8 => SignalValue::U8(clamp_unsigned(value, u8::MAX as f64) as u8),
            SignalType::I8 => {
                SignalValue::I8(clamp_signed(value, i8::MIN as f64, i8::MAX as f64) as i8)
            }
            SignalType::U16 => SignalValue::U16(clamp_unsigned(value, u16::MAX as f64) as u16),
            SignalType::I16 => {
                SignalValue::I16(clamp_signed(value, i16::MIN as f64, i16::MAX as f64) as i16)
            }
            SignalType::U32 => SignalValue::U32(clamp_unsigned(value, u32::MAX as f64) as u32),
            SignalType::I32 => {
                SignalValue::I32(clamp_signed(value, i32::MIN as f64, i32::MAX as f64) as i32)
            }
            SignalType::U64 => SignalValue::U64(clamp_unsigned(value, u64::MAX as f64) as u64),
            SignalType::I64 => {
                SignalValue::I64(clamp_signed(value, i64::MIN as f64, i64::MAX as f64) as i64)
            }
            SignalType::F32 => SignalValue::F32(value as f32),
            SignalType::F64 => SignalValue::F64(value),
            SignalType::Bool => SignalValue::Bool(value != 0.0),
            SignalType::String => return None,
        })
    }
}

fn clamp_unsigned(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

fn clamp_signed(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
