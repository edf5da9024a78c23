// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload persistence across transport outages and restarts

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn payload_survives_restart_and_is_resent_on_reconnect() {
    // Phase 1: transport down, campaign fires, payload spills to disk
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().to_path_buf();
    let world = World::start_in(dir);
    world.transport.set_online(false);
    world.submit_manifest(speed_manifest("m1")).await;
    world.submit_schemes(speed_campaign("c1", "m1", true)).await;

    world.sample("Vehicle.Speed", 10, 150.0).await;
    settle().await;

    let payload_dir = path.join("payloads");
    let stored: Vec<_> = std::fs::read_dir(&payload_dir)
        .expect("payload dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    let bin_name = stored
        .iter()
        .find(|name| name.ends_with(".bin"))
        .expect("payload .bin on disk")
        .clone();
    assert!(stored.iter().any(|name| name.ends_with(".json") && *name != "index.json"));
    let stored_bytes = std::fs::read(payload_dir.join(&bin_name)).expect("read stored payload");

    // The index lists exactly this payload
    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(payload_dir.join("index.json")).unwrap()).unwrap();
    assert_eq!(index.as_array().map(|a| a.len()), Some(1));

    let dir = world.dir;
    world.agent.shutdown().await;

    // Phase 2: restart over the same root with the transport up
    let world = World::start_in(dir);
    tokio::time::sleep(Duration::from_millis(1_100)).await; // one upload-retry interval

    let sent = world.transport.sent_on(canopy_transport::TransportTopic::VehicleData);
    assert_eq!(sent.len(), 1, "persisted payload must be re-sent");
    assert_eq!(sent[0], stored_bytes, "re-sent bytes are byte-identical");

    // Files and index entries are gone after the successful send
    assert!(!payload_dir.join(&bin_name).exists());
    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(payload_dir.join("index.json")).unwrap()).unwrap();
    assert_eq!(index.as_array().map(|a| a.len()), Some(0));

    world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transient_payloads_are_dropped_when_offline() {
    let world = World::start();
    world.transport.set_online(false);
    world.submit_manifest(speed_manifest("m1")).await;
    world.submit_schemes(speed_campaign("c1", "m1", false)).await;

    world.sample("Vehicle.Speed", 10, 150.0).await;
    settle().await;

    let payload_dir = world.dir.path().join("payloads");
    let bins = std::fs::read_dir(&payload_dir)
        .expect("payload dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".bin"))
        .count();
    assert_eq!(bins, 0, "non-persistent payloads never hit the disk");
    assert!(world.agent.counters.payloads_dropped.get() >= 1);

    world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn documents_replay_from_disk_on_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world = World::start_in(dir);
    world.submit_manifest(speed_manifest("m1")).await;
    world.submit_schemes(speed_campaign("c1", "m1", false)).await;
    let dir = world.dir;
    world.agent.shutdown().await;

    // The fresh agent replays both documents and the campaign runs
    let world = World::start_in(dir);
    settle().await;
    world.sample("Vehicle.Speed", 10, 150.0).await;

    assert_eq!(world.vehicle_data().len(), 1);
    world.agent.shutdown().await;
}
