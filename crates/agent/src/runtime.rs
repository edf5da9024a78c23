// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent assembly and lifecycle

use crate::glue::{TransportCheckinSink, TransportResponseSink};
use canopy_adapters::NamedSignalDataSource;
use canopy_campaign::{CampaignManager, CheckinTask, DecoderDictionary, DocumentHandle};
use canopy_command::{CommandExecutor, CommandHandle, Dispatcher};
use canopy_core::{AgentConfig, Clock, Counters, EventIdGenerator};
use canopy_inspection::{
    register_math_functions, CustomFunction, CustomFunctionRegistry, DistributorHandle,
    EngineConfig, InspectionEngine, SignalBufferDistributor,
};
use async_trait::async_trait;
use canopy_store::{DocumentStore, PayloadStore, StoreError};
use canopy_transport::{
    HeapQuota, RetryDriver, RetryHandle, RetryStatus, Retryable, Sender, SenderConfig, Transport,
};
use smol_str::SmolStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to initialize persistency root: {0}")]
    Persistency(#[from] StoreError),
}

/// Everything the embedder injects, plus the config.
pub struct AgentBuilder<T: Transport, C: Clock> {
    config: AgentConfig,
    transport: T,
    clock: C,
    dispatchers: Vec<Arc<dyn Dispatcher>>,
    functions: Vec<(SmolStr, Box<dyn CustomFunction>)>,
}

impl<T: Transport, C: Clock> AgentBuilder<T, C> {
    pub fn new(config: AgentConfig, transport: T, clock: C) -> Self {
        Self { config, transport, clock, dispatchers: Vec::new(), functions: Vec::new() }
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    pub fn custom_function(
        mut self,
        name: impl Into<SmolStr>,
        function: Box<dyn CustomFunction>,
    ) -> Self {
        self.functions.push((name.into(), function));
        self
    }

    /// Build the stores, connect the channels, spawn every task.
    /// Only persistency-root failures abort; everything else recovers
    /// at runtime.
    pub fn start(self) -> Result<RunningAgent<C>, StartError> {
        let counters = Counters::new();
        let cancel = CancellationToken::new();

        let documents = DocumentStore::open(&self.config.persistency_path)?;
        let payload_store = PayloadStore::open(
            &self.config.persistency_path.join("payloads"),
            self.config.payload_store_quota_bytes,
            counters.clone(),
        )?;

        let (manager, documents_handle, dictionary_rx, campaigns_rx) =
            CampaignManager::new(documents, counters.clone());

        let quota = HeapQuota::new(self.config.max_sdk_heap_bytes);
        let (sender, sender_handle) = Sender::new(
            self.transport.clone(),
            payload_store,
            quota,
            SenderConfig::from_agent(&self.config),
            counters.clone(),
        );

        let (distributor, distributor_handle) =
            SignalBufferDistributor::new(self.config.signal_queue_capacity, counters.clone());

        let mut registry = CustomFunctionRegistry::new();
        register_math_functions(&mut registry);
        for (name, function) in self.functions {
            registry.register(name, function);
        }

        let event_ids = EventIdGenerator::new(self.clock.epoch_ms());
        let engine = InspectionEngine::new(
            distributor,
            campaigns_rx.clone(),
            sender_handle,
            registry,
            self.clock.clone(),
            event_ids,
            counters.clone(),
            EngineConfig { max_tick_ms: self.config.inspection_max_tick_ms },
        );

        let checkin = CheckinTask::new(
            TransportCheckinSink::new(self.transport.clone()),
            self.clock.clone(),
            self.config.checkin_interval_ms,
            campaigns_rx,
        );

        let (executor, commands_handle) = CommandExecutor::new(
            self.dispatchers,
            dictionary_rx.clone(),
            TransportResponseSink::new(self.transport.clone()),
            counters.clone(),
        );

        let connect_driver = RetryDriver::new(
            self.config.connect_retry_start_ms,
            self.config.connect_retry_max_ms,
        );
        let reconnect = connect_driver.handle();
        let supervisor = ConnectSupervisor { transport: self.transport.clone() };

        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();
        tasks.push(("campaign-manager", tokio::spawn(manager.run(cancel.clone()))));
        tasks.push(("inspection-engine", tokio::spawn(engine.run(cancel.clone()))));
        tasks.push(("sender", tokio::spawn(sender.run(cancel.clone()))));
        tasks.push(("checkin", tokio::spawn(checkin.run(cancel.clone()))));
        tasks.push(("command-executor", tokio::spawn(executor.run(cancel.clone()))));
        tasks.push(("connect-retry", tokio::spawn(connect_driver.run(supervisor, cancel.clone()))));
        tasks.push(("counter-summary", tokio::spawn(summary_loop(counters.clone(), cancel.clone()))));

        tracing::info!(
            persistency = %self.config.persistency_path.display(),
            "canopy agent started"
        );

        Ok(RunningAgent {
            cancel,
            tasks,
            documents: documents_handle,
            commands: commands_handle,
            signals: distributor_handle,
            dictionary_rx,
            clock: self.clock,
            counters,
            reconnect,
        })
    }
}

/// Drives `Transport::connect` under the retry driver's exponential
/// backoff. Parks after a successful connect until
/// [`RunningAgent::reconnect`] wakes it.
struct ConnectSupervisor<T: Transport> {
    transport: T,
}

#[async_trait]
impl<T: Transport> Retryable for ConnectSupervisor<T> {
    async fn attempt(&mut self) -> RetryStatus {
        match self.transport.connect().await {
            Ok(()) => {
                tracing::info!("transport connected");
                RetryStatus::Success
            }
            Err(e) => {
                tracing::debug!(error = %e, "transport connect failed");
                RetryStatus::Retry
            }
        }
    }
}

/// Periodic one-line counter summary.
async fn summary_loop(counters: Counters, cancel: CancellationToken) {
    let mut tick = tokio::time::interval(Duration::from_secs(60));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // Skip the immediate first tick
    tick.tick().await;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tick.tick() => tracing::info!("counters: {}", counters.summary()),
        }
    }
}

/// Handles into a running agent. Dropping this does not stop the
/// agent; call [`RunningAgent::shutdown`].
pub struct RunningAgent<C: Clock> {
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    /// Inbound cloud documents go here (from the transport receiver)
    pub documents: DocumentHandle,
    /// Inbound actuator commands go here
    pub commands: CommandHandle,
    /// Raw decoded-sample ingestion for adapters that resolve IDs
    /// themselves
    pub signals: DistributorHandle,
    dictionary_rx: watch::Receiver<Option<Arc<DecoderDictionary>>>,
    clock: C,
    pub counters: Counters,
    reconnect: RetryHandle,
}

impl<C: Clock> RunningAgent<C> {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Kick the connection supervisor: resets its backoff and attempts
    /// a fresh `Transport::connect`. Embedders call this when their
    /// transport reports a lost connection.
    pub fn reconnect(&self) {
        self.reconnect.restart();
    }

    /// Name-based ingestion facade for source adapters.
    pub fn named_source(&self) -> NamedSignalDataSource<C> {
        NamedSignalDataSource::new(
            self.dictionary_rx.clone(),
            self.signals.clone(),
            self.clock.clone(),
        )
    }

    /// Stop every task and wait for them, bounded per task. The sender
    /// flushes queued persistent payloads on its way out.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (name, task) in self.tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(task = name, error = %e, "task panicked"),
                Err(_) => tracing::warn!(task = name, "task did not stop in time, detaching"),
            }
        }
        tracing::info!("canopy agent stopped");
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
