// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use canopy_campaign::{DecoderManifest, NamedSignal};
use canopy_core::{Counters, FakeClock, SignalId, SignalType, SyncId};
use canopy_inspection::SignalBufferDistributor;

type Fixture = (
    NamedSignalDataSource<FakeClock>,
    SignalBufferDistributor,
    FakeClock,
    watch::Sender<Option<Arc<DecoderDictionary>>>,
);

fn fixture() -> Fixture {
    let manifest = DecoderManifest {
        id: SyncId::new("m1"),
        can_frames: vec![],
        obd_pids: vec![],
        custom_signals: vec![],
        named_signals: vec![
            NamedSignal {
                name: "Vehicle.Speed".into(),
                signal_id: SignalId(1),
                signal_type: SignalType::F64,
            },
            NamedSignal {
                name: "Vehicle.VIN".into(),
                signal_id: SignalId(2),
                signal_type: SignalType::String,
            },
        ],
    };
    let dictionary = DecoderDictionary::from_manifest(&manifest).unwrap();
    let (dictionary_tx, dictionary_rx) = watch::channel(Some(Arc::new(dictionary)));
    let (consumer, handle) = SignalBufferDistributor::new(100, Counters::new());
    let clock = FakeClock::new();
    clock.advance_ms(500);
    let source = NamedSignalDataSource::new(dictionary_rx, handle, clock.clone());
    (source, consumer, clock, dictionary_tx)
}

#[test]
fn known_name_resolves_and_pushes() {
    let (source, consumer, _, _tx) = fixture();

    assert!(source.ingest_value(123_456, "Vehicle.Speed", DecodedValue::Double(88.0)));

    let samples = consumer.drain();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].signal_id, SignalId(1));
    assert_eq!(samples[0].signal_type, canopy_core::SignalType::F64);
    assert_eq!(samples[0].wall_ts_ms, 123_456);
    assert_eq!(samples[0].monotonic_ts_ms, 500);
}

#[test]
fn zero_timestamp_means_now() {
    let (source, consumer, clock, _tx) = fixture();
    clock.set_epoch_ms(9_999);

    source.ingest_value(0, "Vehicle.Speed", DecodedValue::Double(1.0));

    assert_eq!(consumer.drain()[0].wall_ts_ms, 9_999);
}

#[test]
fn unknown_name_is_dropped() {
    let (source, consumer, _, _tx) = fixture();

    assert!(!source.ingest_value(1, "Vehicle.Nothing", DecodedValue::Double(1.0)));
    assert!(consumer.is_empty());
}

#[test]
fn ingest_multiple_pushes_resolvable_entries_in_order() {
    let (source, consumer, _, _tx) = fixture();

    let pushed = source.ingest_multiple(
        7,
        [
            ("Vehicle.Speed", DecodedValue::Double(10.0)),
            ("Vehicle.Nothing", DecodedValue::Double(0.0)),
            ("Vehicle.VIN", DecodedValue::String("WDD123".into())),
        ],
    );

    assert_eq!(pushed, 2);
    let samples = consumer.drain();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].signal_id, SignalId(1));
    assert_eq!(samples[1].signal_id, SignalId(2));
    assert_eq!(samples[1].wall_ts_ms, 7);
}

#[test]
fn dictionary_swap_changes_resolution() {
    let (source, consumer, _, tx) = fixture();

    tx.send(None).unwrap();
    assert!(!source.ingest_value(1, "Vehicle.Speed", DecodedValue::Double(1.0)));
    assert!(consumer.is_empty());
}

#[test]
fn named_signal_id_lookup() {
    let (source, _, _, _tx) = fixture();
    assert_eq!(source.named_signal_id("Vehicle.Speed"), Some(SignalId(1)));
    assert_eq!(source.named_signal_id("Vehicle.Nothing"), None);
}
