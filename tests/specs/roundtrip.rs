// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round-trip and idempotence properties

use canopy_campaign::{parse_scheme_list, CollectionSchemeList};
use canopy_core::{Counters, EventId, SyncId};
use canopy_store::{PayloadMeta, PayloadStore};
use similar_asserts::assert_eq;

#[test]
fn scheme_list_serialize_then_parse_is_identity() {
    let json = serde_json::json!({
        "campaigns": [{
            "id": "c1",
            "decoder_manifest_id": "m1",
            "start_time_ms": 5,
            "expiry_time_ms": 50_000,
            "priority": 2,
            "persist": true,
            "compress": true,
            "min_publish_interval_ms": 250,
            "after_duration_ms": 100,
            "trigger_only_on_rising_edge": true,
            "collect_signals": [
                { "signal_id": 1, "retention": { "window_ms": 1_000, "max_samples": 10 } }
            ],
            "collect_condition": [
                { "kind": "binary", "op": "gt", "left": 1, "right": 2 },
                { "kind": "signal_ref", "signal_id": 1 },
                { "kind": "constant", "value": 100.0 }
            ],
            "fetch_information": [{
                "signal_id": 1,
                "condition": [ { "kind": "constant", "value": true } ],
                "action": [ { "kind": "custom_function", "name": "request", "args": [] } ],
                "max_execution_per_interval": 3,
                "execution_interval_ms": 1_000
            }]
        }]
    });

    let first: CollectionSchemeList =
        parse_scheme_list(json.to_string().as_bytes()).expect("parse");
    let reserialized = serde_json::to_vec(&first).expect("serialize");
    let second: CollectionSchemeList = parse_scheme_list(&reserialized).expect("reparse");

    assert_eq!(first, second);
}

#[test]
fn persisted_payload_bytes_read_back_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = PayloadStore::open(dir.path(), 1_000_000, Counters::new()).expect("open");

    let bytes: Vec<u8> = (0u16..4_096).map(|i| (i % 251) as u8).collect();
    let meta = PayloadMeta::new(SyncId::new("c1"), EventId(42), bytes.len() as u64, 1, false);
    store.store(&bytes, meta).expect("store");

    // Same process read-back
    let (_, read) = store.oldest().expect("read").expect("entry");
    assert_eq!(read, bytes);

    // Fresh store over the same directory (restart)
    drop(store);
    let reopened = PayloadStore::open(dir.path(), 1_000_000, Counters::new()).expect("reopen");
    let (meta, read) = reopened.oldest().expect("read").expect("entry");
    assert_eq!(read, bytes);
    assert_eq!(meta.event_id, EventId(42));
}
