// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OBD-II PID response decoding

use canopy_campaign::PidFormat;
use canopy_core::DecodedValue;

/// Decode one PID's value from the response data bytes (after the mode
/// and PID echo have been stripped). Returns `None` when the format's
/// byte range does not fit the response.
pub fn decode_obd_response(format: &PidFormat, data: &[u8]) -> Option<DecodedValue> {
    let start = format.byte_offset as usize;
    let end = start + format.num_bytes as usize;
    if format.num_bytes == 0 || format.num_bytes > 8 || end > data.len() {
        return None;
    }
    let mut raw: u64 = 0;
    for byte in &data[start..end] {
        raw = (raw << 8) | *byte as u64;
    }
    Some(DecodedValue::Double(raw as f64 * format.scale + format.offset))
}

#[cfg(test)]
#[path = "obd_tests.rs"]
mod tests;
