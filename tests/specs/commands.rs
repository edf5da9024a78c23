// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actuator command handling through the whole agent

use crate::prelude::*;
use canopy_adapters::{FakeDispatcher, FakeTransport};
use canopy_agent::AgentBuilder;
use canopy_command::DispatcherStatus;
use canopy_core::FakeClock;
use canopy_transport::{CommandRequest, CommandResponseMessage, CommandStatus, TransportTopic};
use std::sync::Arc;

struct CommandWorld {
    world: World,
    dispatcher: FakeDispatcher,
}

impl CommandWorld {
    async fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let clock = FakeClock::new();
        let transport = FakeTransport::new();
        let dispatcher = FakeDispatcher::new(&["Vehicle.Trunk"]);
        let agent = AgentBuilder::new(config_for(dir.path()), transport.clone(), clock.clone())
            .dispatcher(Arc::new(dispatcher.clone()))
            .start()
            .expect("agent start");
        let world = World { agent, clock, transport, dir };
        world.submit_manifest(speed_manifest("m1")).await;
        Self { world, dispatcher }
    }

    fn submit(&self, command_id: &str, signal: &str, timeout_ms: u64) {
        self.world.agent.commands.submit(CommandRequest {
            command_id: command_id.into(),
            signal_name: signal.into(),
            value: DecodedValue::Bool(true),
            issued_ts_ms: 1,
            execution_timeout_ms: timeout_ms,
        });
    }

    fn responses(&self) -> Vec<CommandResponseMessage> {
        self.world
            .transport
            .sent_on(TransportTopic::CommandResponse)
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).expect("response json"))
            .collect()
    }
}

#[tokio::test(start_paused = true)]
async fn command_succeeds_via_dispatcher_callback() {
    let w = CommandWorld::start().await;

    w.submit("cmd-1", "Vehicle.Trunk", 0);
    settle().await;
    assert_eq!(w.dispatcher.calls().len(), 1);

    w.dispatcher.status_sender(0).unwrap().send(DispatcherStatus::succeeded());
    settle().await;

    let responses = w.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].command_id, "cmd-1");
    assert_eq!(responses[0].status, CommandStatus::Succeeded);

    w.world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn command_times_out_and_late_callback_is_ignored() {
    let w = CommandWorld::start().await;

    w.submit("cmd-2", "Vehicle.Trunk", 500);
    settle().await;

    // Dispatcher never calls back; the executor times out at 500ms
    tokio::time::sleep(Duration::from_millis(600)).await;
    let responses = w.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status, CommandStatus::TimedOut);

    // Late dispatcher callback must not publish a second terminal
    w.dispatcher.status_sender(0).unwrap().send(DispatcherStatus::succeeded());
    settle().await;
    assert_eq!(w.responses().len(), 1);

    w.world.agent.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_actuator_is_rejected() {
    let w = CommandWorld::start().await;

    w.submit("cmd-3", "Vehicle.Unknown", 0);
    settle().await;

    let responses = w.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status, CommandStatus::Rejected);
    assert!(w.dispatcher.calls().is_empty());

    w.world.agent.shutdown().await;
}
