// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample(signal: u32, ts: u64) -> DecodedSample {
    DecodedSample {
        signal_id: SignalId(signal),
        signal_type: SignalType::F64,
        monotonic_ts_ms: ts,
        wall_ts_ms: ts,
        value: DecodedValue::Double(ts as f64),
        source: SourceTag::Can,
    }
}

#[test]
fn samples_drain_in_arrival_order() {
    let (distributor, handle) = SignalBufferDistributor::new(10, Counters::new());
    handle.push(sample(1, 10));
    handle.push(sample(2, 20));
    handle.push(sample(1, 30));

    let drained = distributor.drain();
    let ts: Vec<u64> = drained.iter().map(|s| s.monotonic_ts_ms).collect();
    assert_eq!(ts, vec![10, 20, 30]);
    assert!(distributor.is_empty());
}

#[test]
fn overflow_drops_oldest_and_counts() {
    let counters = Counters::new();
    let (distributor, handle) = SignalBufferDistributor::new(2, counters.clone());
    handle.push(sample(1, 10));
    handle.push(sample(1, 20));
    handle.push(sample(1, 30));

    let drained = distributor.drain();
    let ts: Vec<u64> = drained.iter().map(|s| s.monotonic_ts_ms).collect();
    assert_eq!(ts, vec![20, 30]);
    assert_eq!(counters.samples_dropped.get(), 1);
}

#[test]
fn push_all_keeps_relative_order() {
    let (distributor, handle) = SignalBufferDistributor::new(10, Counters::new());
    handle.push_all([sample(1, 10), sample(2, 10), sample(3, 10)]);

    let drained = distributor.drain();
    let ids: Vec<u32> = drained.iter().map(|s| s.signal_id.0).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn wait_wakes_on_push() {
    let (distributor, handle) = SignalBufferDistributor::new(10, Counters::new());

    let pusher = tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        handle.push(sample(1, 1));
    });

    distributor.wait().await;
    assert_eq!(distributor.len(), 1);
    pusher.await.unwrap();
}

#[tokio::test]
async fn wait_returns_immediately_when_data_is_queued() {
    let (distributor, handle) = SignalBufferDistributor::new(10, Counters::new());
    handle.push(sample(1, 1));
    distributor.wait().await;
}
