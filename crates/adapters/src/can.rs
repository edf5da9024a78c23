// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CAN frame payload decoding
//!
//! Extracts the signals a [`FrameFormat`] describes from raw frame
//! bytes. Intel (little-endian) signals count bits from the LSB of
//! byte 0; Motorola (big-endian) signals count from the MSB.

use canopy_campaign::FrameFormat;
use canopy_core::{DecodedValue, SignalId};

/// Decode every signal of one frame. Signals whose bit range does not
/// fit the frame are skipped.
pub fn decode_can_frame(format: &FrameFormat, data: &[u8]) -> Vec<(SignalId, DecodedValue)> {
    let mut out = Vec::with_capacity(format.signals.len());
    for signal in &format.signals {
        let Some(raw) = extract_bits(
            data,
            signal.start_bit,
            signal.length_bits,
            signal.big_endian,
        ) else {
            tracing::trace!(signal = %signal.signal_id, "signal bit range outside frame");
            continue;
        };
        let value = if signal.signed {
            sign_extend(raw, signal.length_bits) as f64
        } else {
            raw as f64
        };
        let physical = value * signal.factor + signal.offset;
        out.push((signal.signal_id, DecodedValue::Double(physical)));
    }
    out
}

fn extract_bits(data: &[u8], start_bit: u16, length_bits: u8, big_endian: bool) -> Option<u64> {
    let length = length_bits as u32;
    if length == 0 || length > 64 {
        return None;
    }
    let total_bits = (data.len() * 8) as u32;
    if start_bit as u32 + length > total_bits {
        return None;
    }
    let mut raw: u64 = 0;
    if big_endian {
        // MSB-first: bit n is bit (7 - n%8) of byte n/8
        for i in 0..length {
            let n = start_bit as u32 + i;
            let bit = (data[(n / 8) as usize] >> (7 - (n % 8))) & 1;
            raw = (raw << 1) | bit as u64;
        }
    } else {
        // LSB-first: bit n is bit n%8 of byte n/8
        for i in 0..length {
            let n = start_bit as u32 + i;
            let bit = (data[(n / 8) as usize] >> (n % 8)) & 1;
            raw |= (bit as u64) << i;
        }
    }
    Some(raw)
}

fn sign_extend(raw: u64, length_bits: u8) -> i64 {
    let shift = 64 - length_bits as u32;
    ((raw << shift) as i64) >> shift
}

#[cfg(test)]
#[path = "can_tests.rs"]
mod tests;
