// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by this crate's tests

use crate::decoder::{
    CanFrameEntry, CanSignalFormat, CustomDecodedSignal, DecoderManifest, FrameFormat,
    InterfaceId, NamedSignal, PidFormat,
};
use crate::model::{Campaign, CollectSignal, SignalRetention};
use canopy_core::test_support::threshold_tree;
use canopy_core::{BinaryOp, SignalId, SignalType, SyncId};
use smol_str::SmolStr;

/// Rising-edge `signal 1 > 100` campaign bound to `manifest-1`
pub(crate) fn campaign(id: &str) -> Campaign {
    Campaign {
        id: SyncId::new(id),
        decoder_manifest_id: SyncId::new("manifest-1"),
        start_time_ms: 0,
        expiry_time_ms: u64::MAX,
        priority: 0,
        persist: false,
        compress: false,
        min_publish_interval_ms: 0,
        after_duration_ms: 0,
        trigger_only_on_rising_edge: true,
        collect_signals: vec![CollectSignal {
            signal_id: SignalId(1),
            retention: SignalRetention { window_ms: 1_000, max_samples: 100 },
        }],
        collect_condition: threshold_tree(SignalId(1), BinaryOp::Gt, 100.0),
        fetch_information: vec![],
        store_and_forward: None,
    }
}

/// Manifest with one CAN frame, one OBD PID, one custom signal, and a
/// named binding for signal 1
pub(crate) fn manifest(id: &str) -> DecoderManifest {
    DecoderManifest {
        id: SyncId::new(id),
        can_frames: vec![CanFrameEntry {
            interface_id: InterfaceId::new("vcan0"),
            frame_id: 0x123,
            format: FrameFormat {
                signals: vec![CanSignalFormat {
                    signal_id: SignalId(1),
                    signal_type: SignalType::U16,
                    start_bit: 0,
                    length_bits: 16,
                    factor: 0.5,
                    offset: 0.0,
                    big_endian: false,
                    signed: false,
                }],
            },
        }],
        obd_pids: vec![PidFormat {
            pid: 0x0D,
            signal_id: SignalId(2),
            signal_type: SignalType::U8,
            byte_offset: 0,
            num_bytes: 1,
            scale: 1.0,
            offset: 0.0,
        }],
        custom_signals: vec![CustomDecodedSignal {
            interface_id: InterfaceId::new("gps0"),
            decoder: SmolStr::new("latitude"),
            signal_id: SignalId(3),
            signal_type: SignalType::F64,
        }],
        named_signals: vec![NamedSignal {
            name: SmolStr::new("Vehicle.Speed"),
            signal_id: SignalId(1),
            signal_type: SignalType::U16,
        }],
    }
}
