// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger semantics through the whole agent

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn single_signal_threshold_fires_on_rising_edges() {
    let world = World::start();
    world.submit_manifest(speed_manifest("m1")).await;
    world.submit_schemes(speed_campaign("c1", "m1", false)).await;

    let mut fire_counts = Vec::new();
    for (ts, value) in [(0u64, 50.0), (10, 80.0), (20, 120.0), (30, 150.0), (40, 90.0), (50, 130.0)]
    {
        world.sample("Vehicle.Speed", ts, value).await;
        fire_counts.push(world.vehicle_data().len());
    }

    // Rising edges at t=20 and t=50 only
    assert_eq!(fire_counts, vec![0, 0, 1, 1, 1, 2]);

    // The first payload carries the window up to the trigger
    let first = &world.vehicle_data()[0];
    assert_eq!(first.campaign_id.as_str(), "c1");
    let values: Vec<f64> = first
        .signals
        .iter()
        .map(|s| match &s.value {
            canopy_core::CollectedValue::Number(n) => *n,
            other => panic!("unexpected value {other:?}"),
        })
        .collect();
    assert_eq!(values, vec![50.0, 80.0, 120.0]);

    world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn windowed_average_campaign() {
    let world = World::start();
    world.submit_manifest(speed_manifest("m1")).await;
    world
        .submit_schemes(serde_json::json!({
            "campaigns": [{
                "id": "avg-campaign",
                "decoder_manifest_id": "m1",
                "start_time_ms": 0,
                "expiry_time_ms": u64::MAX,
                "trigger_only_on_rising_edge": true,
                "collect_signals": [
                    { "signal_id": 1, "retention": { "window_ms": 10_000, "max_samples": 100 } }
                ],
                "collect_condition": [
                    { "kind": "binary", "op": "ge", "left": 1, "right": 2 },
                    { "kind": "window", "signal_id": 1, "function": "avg", "window_ms": 1_000 },
                    { "kind": "constant", "value": 50.0 }
                ]
            }]
        }))
        .await;

    let mut fired_at = None;
    for (ts, value) in
        [(0u64, 40.0), (200, 60.0), (400, 60.0), (600, 40.0), (800, 50.0), (1_000, 80.0)]
    {
        world.sample("Vehicle.Speed", ts, value).await;
        if fired_at.is_none() && !world.vehicle_data().is_empty() {
            fired_at = Some(ts);
        }
    }

    // Average over [0, 1000] first reaches 50 at t=1000 (≈55)
    assert_eq!(fired_at, Some(1_000));
    world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn is_null_short_circuit_fires_without_the_other_operand() {
    let world = World::start();
    world.submit_manifest(speed_manifest("m1")).await;
    // IsNull(speed) || trunk > 0: speed never gets a sample, trunk
    // doesn't either; the left operand alone must fire the campaign
    world
        .submit_schemes(serde_json::json!({
            "campaigns": [{
                "id": "isnull-campaign",
                "decoder_manifest_id": "m1",
                "start_time_ms": 0,
                "expiry_time_ms": u64::MAX,
                "trigger_only_on_rising_edge": true,
                "collect_signals": [
                    { "signal_id": 2, "retention": { "window_ms": 10_000, "max_samples": 10 } }
                ],
                "collect_condition": [
                    { "kind": "binary", "op": "or", "left": 1, "right": 2 },
                    { "kind": "is_null", "signal_id": 1 },
                    { "kind": "binary", "op": "gt", "left": 3, "right": 4 },
                    { "kind": "signal_ref", "signal_id": 2 },
                    { "kind": "constant", "value": 0.0 }
                ]
            }]
        }))
        .await;

    // Give the engine a tick to evaluate with an empty buffer
    tokio::time::sleep(Duration::from_millis(1_100)).await;

    assert_eq!(world.vehicle_data().len(), 1);
    world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn fires_respect_min_publish_interval() {
    let world = World::start();
    world.submit_manifest(speed_manifest("m1")).await;
    world
        .submit_schemes(serde_json::json!({
            "campaigns": [{
                "id": "rate-limited",
                "decoder_manifest_id": "m1",
                "start_time_ms": 0,
                "expiry_time_ms": u64::MAX,
                "trigger_only_on_rising_edge": false,
                "min_publish_interval_ms": 100,
                "collect_signals": [
                    { "signal_id": 1, "retention": { "window_ms": 10_000, "max_samples": 100 } }
                ],
                "collect_condition": [
                    { "kind": "binary", "op": "gt", "left": 1, "right": 2 },
                    { "kind": "signal_ref", "signal_id": 1 },
                    { "kind": "constant", "value": 100.0 }
                ]
            }]
        }))
        .await;

    for ts in [0u64, 30, 60, 100, 130, 200] {
        world.sample("Vehicle.Speed", ts, 120.0).await;
    }

    // Consecutive fires are at least 100ms apart: t=0, 100, 200
    assert_eq!(world.vehicle_data().len(), 3);
    world.agent.shutdown().await;
}
