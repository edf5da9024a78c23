// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use canopy_adapters::FakeTransport;
use canopy_core::{DecodedValue, FakeClock};
use canopy_transport::TransportTopic;
use tempfile::tempdir;

fn config(dir: &tempfile::TempDir) -> AgentConfig {
    let mut config = AgentConfig::with_persistency_path(dir.path());
    config.checkin_interval_ms = 1_000;
    config
}

#[tokio::test(start_paused = true)]
async fn agent_starts_and_shuts_down_cleanly() {
    let dir = tempdir().unwrap();
    let agent = AgentBuilder::new(config(&dir), FakeTransport::new(), FakeClock::new())
        .start()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn checkins_flow_through_the_transport() {
    let dir = tempdir().unwrap();
    let transport = FakeTransport::new();
    let agent =
        AgentBuilder::new(config(&dir), transport.clone(), FakeClock::new()).start().unwrap();

    tokio::time::sleep(Duration::from_millis(2_100)).await;

    assert!(
        !transport.sent_on(TransportTopic::Checkin).is_empty(),
        "periodic check-ins must reach the transport"
    );
    agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn connect_supervisor_retries_until_the_transport_is_up() {
    let dir = tempdir().unwrap();
    let transport = FakeTransport::new();
    transport.set_online(false);
    let agent =
        AgentBuilder::new(config(&dir), transport.clone(), FakeClock::new()).start().unwrap();

    // Backoff starts at 1s and doubles; several attempts land in 10s
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    let while_down = transport.connect_attempts();
    assert!(while_down >= 3, "expected repeated connect attempts, got {while_down}");

    // Once the transport is reachable, a reconnect kick succeeds and
    // the supervisor parks
    transport.set_online(true);
    agent.reconnect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = transport.connect_attempts();
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(transport.connect_attempts(), settled, "supervisor must park after success");

    agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn startup_fails_on_unwritable_persistency_root() {
    let dir = tempdir().unwrap();
    // A file where the root should be makes create_dir_all fail
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, b"in the way").unwrap();
    let mut config = AgentConfig::with_persistency_path(&blocked);
    config.checkin_interval_ms = 1_000;

    let result = AgentBuilder::new(config, FakeTransport::new(), FakeClock::new()).start();
    assert!(matches!(result, Err(StartError::Persistency(_))));
}

#[tokio::test(start_paused = true)]
async fn named_source_resolves_after_manifest_arrival() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let agent =
        AgentBuilder::new(config(&dir), FakeTransport::new(), clock.clone()).start().unwrap();
    let source = agent.named_source();

    // No dictionary yet
    assert!(!source.ingest_value(0, "Vehicle.Speed", DecodedValue::Double(1.0)));

    let manifest = serde_json::json!({
        "id": "m1",
        "named_signals": [
            { "name": "Vehicle.Speed", "signal_id": 1, "signal_type": "u16" }
        ]
    });
    agent
        .documents
        .submit(canopy_campaign::InboundDocument::Manifest(manifest.to_string().into_bytes()));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(source.ingest_value(0, "Vehicle.Speed", DecodedValue::Double(88.0)));
    agent.shutdown().await;
}
