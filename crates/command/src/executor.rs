// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command executor task

use async_trait::async_trait;
use canopy_campaign::DecoderDictionary;
use canopy_core::{Counters, DecodedValue};
use canopy_transport::{CommandRequest, CommandResponseMessage, CommandStatus};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Reason codes carried in command responses.
pub mod reason {
    pub const NONE: u32 = 0;
    pub const NO_DISPATCHER: u32 = 1;
    pub const EXECUTION_TIMEOUT: u32 = 2;
}

/// Terminal status reported by a dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherStatus {
    pub status: CommandStatus,
    pub reason_code: u32,
    pub reason_description: String,
}

impl DispatcherStatus {
    pub fn succeeded() -> Self {
        Self { status: CommandStatus::Succeeded, reason_code: reason::NONE, reason_description: String::new() }
    }

    pub fn failed(reason_code: u32, description: impl Into<String>) -> Self {
        Self { status: CommandStatus::Failed, reason_code, reason_description: description.into() }
    }
}

/// Callback handle a dispatcher uses to report its terminal status.
/// May be called from any thread; calls after the command has already
/// reached a terminal state are ignored.
#[derive(Clone)]
pub struct StatusSender {
    command_id: String,
    tx: mpsc::UnboundedSender<(String, DispatcherStatus)>,
}

impl StatusSender {
    pub fn send(&self, status: DispatcherStatus) {
        let _ = self.tx.send((self.command_id.clone(), status));
    }
}

/// An actuator sink. One dispatcher may own several actuator names.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    /// The actuator signal names this dispatcher owns.
    fn names(&self) -> Vec<SmolStr>;

    /// Apply a value to an actuator. Must not block; the terminal
    /// status arrives asynchronously through `status`.
    async fn set(
        &self,
        name: &str,
        value: DecodedValue,
        command_id: &str,
        issued_ts_ms: u64,
        timeout_ms: u64,
        status: StatusSender,
    );
}

/// Where terminal responses go; the agent glues this to the transport.
#[async_trait]
pub trait ResponseSink: Send + Sync + 'static {
    async fn publish(&self, response: CommandResponseMessage);
}

/// Producer side for the transport receiver.
#[derive(Clone)]
pub struct CommandHandle {
    tx: mpsc::Sender<CommandRequest>,
}

impl CommandHandle {
    pub fn submit(&self, request: CommandRequest) {
        if let Err(e) = self.tx.try_send(request) {
            tracing::warn!(error = %e, "command queue full, dropping request");
        }
    }
}

struct InFlight {
    deadline: Option<Instant>,
}

pub struct CommandExecutor<S: ResponseSink> {
    dispatchers: HashMap<SmolStr, Arc<dyn Dispatcher>>,
    dictionary_rx: watch::Receiver<Option<Arc<DecoderDictionary>>>,
    requests_rx: mpsc::Receiver<CommandRequest>,
    status_tx: mpsc::UnboundedSender<(String, DispatcherStatus)>,
    status_rx: mpsc::UnboundedReceiver<(String, DispatcherStatus)>,
    sink: S,
    in_flight: HashMap<String, InFlight>,
    counters: Counters,
}

impl<S: ResponseSink> CommandExecutor<S> {
    pub fn new(
        dispatchers: Vec<Arc<dyn Dispatcher>>,
        dictionary_rx: watch::Receiver<Option<Arc<DecoderDictionary>>>,
        sink: S,
        counters: Counters,
    ) -> (Self, CommandHandle) {
        let mut by_name = HashMap::new();
        for dispatcher in dispatchers {
            for name in dispatcher.names() {
                if by_name.insert(name.clone(), dispatcher.clone()).is_some() {
                    tracing::warn!(%name, "actuator name registered twice, last dispatcher wins");
                }
            }
        }
        let (tx, requests_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        (
            Self {
                dispatchers: by_name,
                dictionary_rx,
                requests_rx,
                status_tx,
                status_rx,
                sink,
                in_flight: HashMap::new(),
                counters,
            },
            CommandHandle { tx },
        )
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let next_deadline = self.in_flight.values().filter_map(|c| c.deadline).min();
            let timeout = async {
                match next_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                maybe = self.requests_rx.recv() => match maybe {
                    Some(request) => self.handle_request(request).await,
                    None => break,
                },
                maybe = self.status_rx.recv() => {
                    if let Some((command_id, status)) = maybe {
                        self.handle_status(command_id, status).await;
                    }
                }
                _ = timeout => self.expire_overdue().await,
            }
        }
    }

    async fn handle_request(&mut self, request: CommandRequest) {
        if self.in_flight.contains_key(&request.command_id) {
            tracing::warn!(command = %request.command_id, "duplicate command id, first wins");
            return;
        }

        // The name must be a known actuator in the active dictionary
        // and have a registered dispatcher
        let known = self
            .dictionary_rx
            .borrow()
            .as_ref()
            .map(|d| d.named_signal(&request.signal_name).is_some())
            .unwrap_or(false);
        let dispatcher = if known {
            self.dispatchers.get(request.signal_name.as_str()).cloned()
        } else {
            None
        };
        let Some(dispatcher) = dispatcher else {
            tracing::warn!(
                command = %request.command_id,
                signal = %request.signal_name,
                "no dispatcher for actuator"
            );
            self.counters.commands_rejected.increment();
            self.sink
                .publish(CommandResponseMessage {
                    command_id: request.command_id,
                    status: CommandStatus::Rejected,
                    reason_code: reason::NO_DISPATCHER,
                    reason_description: format!("no dispatcher for {}", request.signal_name),
                })
                .await;
            return;
        };

        let deadline = (request.execution_timeout_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(request.execution_timeout_ms));
        self.in_flight.insert(request.command_id.clone(), InFlight { deadline });

        let status = StatusSender { command_id: request.command_id.clone(), tx: self.status_tx.clone() };
        dispatcher
            .set(
                &request.signal_name,
                request.value,
                &request.command_id,
                request.issued_ts_ms,
                request.execution_timeout_ms,
                status,
            )
            .await;
    }

    async fn handle_status(&mut self, command_id: String, status: DispatcherStatus) {
        // Late callbacks for already-terminal commands are dropped
        if self.in_flight.remove(&command_id).is_none() {
            tracing::debug!(command = %command_id, "status for unknown or finished command, ignoring");
            return;
        }
        self.sink
            .publish(CommandResponseMessage {
                command_id,
                status: status.status,
                reason_code: status.reason_code,
                reason_description: status.reason_description,
            })
            .await;
    }

    async fn expire_overdue(&mut self) {
        let now = Instant::now();
        let overdue: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, c)| c.deadline.is_some_and(|d| d <= now))
            .map(|(id, _)| id.clone())
            .collect();
        for command_id in overdue {
            self.in_flight.remove(&command_id);
            self.counters.commands_timed_out.increment();
            tracing::warn!(command = %command_id, "command timed out");
            self.sink
                .publish(CommandResponseMessage {
                    command_id,
                    status: CommandStatus::TimedOut,
                    reason_code: reason::EXECUTION_TIMEOUT,
                    reason_description: "no terminal status from dispatcher".into(),
                })
                .await;
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::{Dispatcher, StatusSender};
    use async_trait::async_trait;
    use canopy_core::DecodedValue;
    use parking_lot::Mutex;
    use smol_str::SmolStr;
    use std::sync::Arc;

    /// Recorded actuation request
    #[derive(Debug, Clone)]
    pub struct SetCall {
        pub name: String,
        pub value: DecodedValue,
        pub command_id: String,
    }

    /// Fake dispatcher recording calls; status reporting is driven by
    /// the test through the captured [`StatusSender`]s.
    #[derive(Clone)]
    pub struct FakeDispatcher {
        names: Vec<SmolStr>,
        calls: Arc<Mutex<Vec<(SetCall, StatusSender)>>>,
    }

    impl FakeDispatcher {
        pub fn new(names: &[&str]) -> Self {
            Self {
                names: names.iter().map(|n| SmolStr::new(n)).collect(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn calls(&self) -> Vec<SetCall> {
            self.calls.lock().iter().map(|(call, _)| call.clone()).collect()
        }

        /// The status sender captured for the nth call.
        pub fn status_sender(&self, index: usize) -> Option<StatusSender> {
            self.calls.lock().get(index).map(|(_, sender)| sender.clone())
        }
    }

    #[async_trait]
    impl Dispatcher for FakeDispatcher {
        fn names(&self) -> Vec<SmolStr> {
            self.names.clone()
        }

        async fn set(
            &self,
            name: &str,
            value: DecodedValue,
            command_id: &str,
            _issued_ts_ms: u64,
            _timeout_ms: u64,
            status: StatusSender,
        ) {
            self.calls.lock().push((
                SetCall {
                    name: name.to_string(),
                    value,
                    command_id: command_id.to_string(),
                },
                status,
            ));
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
