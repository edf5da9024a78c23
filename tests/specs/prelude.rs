// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scenario harness

use canopy_adapters::FakeTransport;
use canopy_agent::{AgentBuilder, RunningAgent};
use canopy_core::{AgentConfig, FakeClock};
use canopy_transport::{CheckinMessage, TransportTopic, VehicleDataMessage};
use std::path::Path;

pub use canopy_core::DecodedValue;
pub use tokio::time::Duration;

pub struct World {
    pub agent: RunningAgent<FakeClock>,
    pub clock: FakeClock,
    pub transport: FakeTransport,
    pub dir: tempfile::TempDir,
}

pub fn config_for(path: &Path) -> AgentConfig {
    let mut config = AgentConfig::with_persistency_path(path);
    config.checkin_interval_ms = 3_600_000; // keep check-ins out of the way
    config.persistency_upload_retry_interval_ms = 1_000;
    config
}

impl World {
    pub fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        Self::start_in(dir)
    }

    pub fn start_in(dir: tempfile::TempDir) -> Self {
        let clock = FakeClock::new();
        let transport = FakeTransport::new();
        let agent = AgentBuilder::new(config_for(dir.path()), transport.clone(), clock.clone())
            .start()
            .expect("agent start");
        Self { agent, clock, transport, dir }
    }

    /// Submit documents and give the manager a beat to apply them.
    pub async fn submit_manifest(&self, json: serde_json::Value) {
        self.agent.documents.submit(canopy_campaign::InboundDocument::Manifest(
            json.to_string().into_bytes(),
        ));
        settle().await;
    }

    pub async fn submit_schemes(&self, json: serde_json::Value) {
        self.agent.documents.submit(canopy_campaign::InboundDocument::SchemeList(
            json.to_string().into_bytes(),
        ));
        settle().await;
    }

    /// Advance the fake clock and push one named-signal sample, then
    /// let the engine evaluate.
    pub async fn sample(&self, name: &str, ts_ms: u64, value: f64) {
        self.clock.set_monotonic_ms(ts_ms);
        self.clock.set_epoch_ms(1_000_000 + ts_ms);
        let source = self.agent.named_source();
        assert!(
            source.ingest_value(1_000_000 + ts_ms, name, DecodedValue::Double(value)),
            "signal {name} must resolve"
        );
        settle().await;
    }

    pub fn vehicle_data(&self) -> Vec<VehicleDataMessage> {
        self.transport
            .sent_on(TransportTopic::VehicleData)
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).expect("vehicle data json"))
            .collect()
    }

    pub fn checkins(&self) -> Vec<CheckinMessage> {
        self.transport
            .sent_on(TransportTopic::Checkin)
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).expect("check-in json"))
            .collect()
    }
}

/// Let the agent's tasks run; paused-clock tests auto-advance through
/// this sleep.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// A manifest with one named u16 speed signal (id 1) and a boolean
/// actuator (id 2).
pub fn speed_manifest(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "named_signals": [
            { "name": "Vehicle.Speed", "signal_id": 1, "signal_type": "u16" },
            { "name": "Vehicle.Trunk", "signal_id": 2, "signal_type": "bool" }
        ]
    })
}

/// One campaign: collect Vehicle.Speed when it exceeds 100.
pub fn speed_campaign(id: &str, manifest_id: &str, persist: bool) -> serde_json::Value {
    serde_json::json!({
        "campaigns": [{
            "id": id,
            "decoder_manifest_id": manifest_id,
            "start_time_ms": 0,
            "expiry_time_ms": u64::MAX,
            "persist": persist,
            "trigger_only_on_rising_edge": true,
            "collect_signals": [
                { "signal_id": 1, "retention": { "window_ms": 10_000, "max_samples": 100 } }
            ],
            "collect_condition": [
                { "kind": "binary", "op": "gt", "left": 1, "right": 2 },
                { "kind": "signal_ref", "signal_id": 1 },
                { "kind": "constant", "value": 100.0 }
            ]
        }]
    })
}
