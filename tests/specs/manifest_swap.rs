// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Campaigns idle and resume across decoder manifest swaps

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn campaign_idles_when_its_manifest_is_replaced() {
    let world = World::start();
    world.submit_manifest(speed_manifest("m1")).await;
    world.submit_schemes(speed_campaign("c1", "m1", false)).await;

    // Campaign runs under m1
    world.sample("Vehicle.Speed", 10, 150.0).await;
    assert_eq!(world.vehicle_data().len(), 1);

    // m2 arrives without the speed signal: c1 goes idle
    world
        .submit_manifest(serde_json::json!({
            "id": "m2",
            "named_signals": [
                { "name": "Vehicle.Trunk", "signal_id": 2, "signal_type": "bool" }
            ]
        }))
        .await;

    // The speed name no longer resolves, and the idle campaign cannot
    // fire even if data were present
    let source = world.agent.named_source();
    assert!(!source.ingest_value(0, "Vehicle.Speed", DecodedValue::Double(200.0)));
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(world.vehicle_data().len(), 1, "idle campaign must not fire");

    world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn campaign_resumes_when_its_manifest_returns() {
    let world = World::start();
    world.submit_manifest(speed_manifest("m1")).await;
    world.submit_schemes(speed_campaign("c1", "m1", false)).await;
    world.sample("Vehicle.Speed", 10, 150.0).await;
    assert_eq!(world.vehicle_data().len(), 1);

    // Swap away and back
    world
        .submit_manifest(serde_json::json!({ "id": "m2", "named_signals": [] }))
        .await;
    world.submit_manifest(speed_manifest("m1")).await;

    // Re-entering the runnable set resets the rising edge, so a true
    // condition fires again once fresh data arrives
    world.sample("Vehicle.Speed", 30, 160.0).await;
    assert_eq!(world.vehicle_data().len(), 2);

    world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn check_in_lists_idle_campaigns_and_active_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_for(dir.path());
    config.checkin_interval_ms = 500;
    let clock = canopy_core::FakeClock::new();
    let transport = canopy_adapters::FakeTransport::new();
    let agent = canopy_agent::AgentBuilder::new(config, transport.clone(), clock.clone())
        .start()
        .expect("agent start");
    let world = World { agent, clock, transport, dir };

    world.submit_manifest(speed_manifest("m1")).await;
    // Campaign for a manifest that is not active: idle, but known
    world.submit_schemes(speed_campaign("c9", "m-elsewhere", false)).await;

    tokio::time::sleep(Duration::from_millis(600)).await;

    let checkins = world.checkins();
    let last = checkins.last().expect("at least one check-in");
    assert!(last.document_ids.iter().any(|id| id.as_str() == "c9"));
    assert!(last.document_ids.iter().any(|id| id.as_str() == "m1"));

    world.agent.shutdown().await;
}
