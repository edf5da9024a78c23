// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use canopy_core::{CollectedValue, SignalId};
use proptest::prelude::*;

#[test]
fn vehicle_data_round_trips() {
    let message = VehicleDataMessage {
        campaign_id: SyncId::new("campaign-9"),
        event_id: EventId(1234),
        trigger_wall_ts_ms: 1_700_000_000_000,
        chunk: 1,
        chunk_count: 3,
        signals: vec![CollectedSignal {
            signal_id: SignalId(12),
            wall_ts_ms: 1_700_000_000_001,
            value: CollectedValue::Number(88.5),
        }],
        dtcs: Some(vec!["P0420".into()]),
        attachments: None,
    };

    let bytes = encode_vehicle_data(&message).unwrap();
    let back: VehicleDataMessage = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(back, message);
}

#[test]
fn whole_copies_payload_fields() {
    let payload = canopy_core::Payload {
        campaign_id: SyncId::new("c"),
        event_id: EventId(5),
        trigger_wall_ts_ms: 10,
        priority: 1,
        compress: true,
        persist: true,
        signals: vec![],
        dtcs: None,
        attachments: None,
    };
    let message = VehicleDataMessage::whole(&payload);
    assert_eq!(message.event_id, EventId(5));
    assert_eq!(message.chunk, 0);
    assert_eq!(message.chunk_count, 1);
}

#[test]
fn checkin_round_trips() {
    let message = CheckinMessage {
        timestamp_ms_epoch: 1_700_000_000_000,
        document_ids: vec![SyncId::new("campaign-1"), SyncId::new("manifest-2")],
    };
    let bytes = encode_checkin(&message).unwrap();
    let back: CheckinMessage = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(back, message);
}

#[test]
fn command_request_decodes_with_default_timeout() {
    let raw = br#"{"command_id":"cmd-1","signal_name":"Vehicle.Trunk","value":true,"issued_ts_ms":123}"#;
    let request = decode_command_request(raw).unwrap();
    assert_eq!(request.command_id, "cmd-1");
    assert_eq!(request.value, canopy_core::DecodedValue::Bool(true));
    assert_eq!(request.execution_timeout_ms, 0);
}

#[test]
fn command_request_rejects_garbage() {
    assert!(decode_command_request(b"{not json").is_err());
}

#[test]
fn command_status_uses_screaming_snake_case() {
    let message = CommandResponseMessage {
        command_id: "cmd-7".into(),
        status: CommandStatus::TimedOut,
        reason_code: 3,
        reason_description: "no dispatcher callback".into(),
    };
    let bytes = encode_command_response(&message).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("\"TIMED_OUT\""));
}

fn collected_value_strategy() -> impl Strategy<Value = CollectedValue> {
    prop_oneof![
        any::<bool>().prop_map(CollectedValue::Bool),
        // Finite values only: JSON cannot carry NaN/inf
        (-1.0e12f64..1.0e12).prop_map(CollectedValue::Number),
        "[a-zA-Z0-9_.]{0,24}".prop_map(CollectedValue::String),
    ]
}

proptest! {
    #[test]
    fn any_vehicle_data_round_trips(
        campaign in "[a-z0-9-]{1,32}",
        event_id in any::<u64>(),
        ts in any::<u64>(),
        chunk in 0u32..16,
        signals in proptest::collection::vec(
            (any::<u32>(), any::<u64>(), collected_value_strategy()),
            0..8,
        ),
    ) {
        let message = VehicleDataMessage {
            campaign_id: SyncId::new(&campaign),
            event_id: EventId(event_id),
            trigger_wall_ts_ms: ts,
            chunk,
            chunk_count: chunk + 1,
            signals: signals
                .into_iter()
                .map(|(id, ts, value)| CollectedSignal {
                    signal_id: SignalId(id),
                    wall_ts_ms: ts,
                    value,
                })
                .collect(),
            dtcs: None,
            attachments: None,
        };
        let bytes = encode_vehicle_data(&message).unwrap();
        let back: VehicleDataMessage = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(back, message);
    }
}
