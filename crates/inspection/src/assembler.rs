// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload assembly
//!
//! Materializes the snapshot for a firing campaign: the requested
//! window of each collected signal, copied out of the history buffer
//! with strings resolved to owned values.

use crate::history::SignalHistoryBuffer;
use canopy_core::{
    CollectedSignal, CollectedValue, EventId, Payload, SignalValue,
};
use canopy_campaign::Campaign;

/// Build the payload for one fire.
///
/// `now_monotonic_ms` is the assembly time: the fire time for immediate
/// assemblies, or fire time + `after_duration_ms` for deferred ones, so
/// post-trigger samples fall inside the window.
pub fn assemble(
    campaign: &Campaign,
    buffer: &SignalHistoryBuffer,
    event_id: EventId,
    trigger_wall_ts_ms: u64,
    now_monotonic_ms: u64,
) -> Payload {
    let mut signals = Vec::new();
    for collect in &campaign.collect_signals {
        let from = now_monotonic_ms.saturating_sub(collect.retention.window_ms);
        let range = buffer.collect_range(
            collect.signal_id,
            from,
            now_monotonic_ms,
            collect.retention.max_samples,
        );
        for (_, wall_ts_ms, value) in range {
            let Some(value) = collected_value(value, buffer) else {
                continue;
            };
            signals.push(CollectedSignal { signal_id: collect.signal_id, wall_ts_ms, value });
        }
    }
    Payload {
        campaign_id: campaign.id.clone(),
        event_id,
        trigger_wall_ts_ms,
        priority: campaign.priority,
        compress: campaign.compress,
        persist: campaign.persists(),
        signals,
        dtcs: None,
        attachments: None,
    }
}

fn collected_value(value: SignalValue, buffer: &SignalHistoryBuffer) -> Option<CollectedValue> {
    Some(match value {
        SignalValue::Bool(b) => CollectedValue::Bool(b),
        SignalValue::String(handle) => CollectedValue::String(buffer.resolve(handle)?.to_string()),
        other => CollectedValue::Number(other.as_f64()?),
    })
}

#[cfg(test)]
#[path = "assembler_tests.rs"]
mod tests;
