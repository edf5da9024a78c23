// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The inspection engine task
//!
//! Single evaluator loop: wakes on new samples or a timer tick,
//! evaluates every runnable campaign in priority-then-id order, and
//! hands fired payloads to the sender. Sole owner of the history
//! buffer and all per-campaign runtime state.

use crate::assembler::assemble;
use crate::custom::{invocation_id, CustomFunctionRegistry, CycleOutput, InvocationId};
use crate::distributor::SignalBufferDistributor;
use crate::eval::{evaluate, EvalContext, EvalErrorCode};
use crate::history::SignalHistoryBuffer;
use canopy_campaign::{Campaign, CampaignSnapshot, SignalRetention};
use canopy_core::{
    Clock, Counters, DecodedValue, EventId, EventIdGenerator, ExpressionNode, ExpressionTree,
    Payload, Sample, SignalId, SignalType, SignalValue, SyncId,
};
use canopy_transport::SenderHandle;
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// History retained for signals that only appear in conditions (not in
/// any collect list): enough for windowed reductions at typical bus
/// rates.
const CONDITION_ONLY_SAMPLES: usize = 256;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cap on the tick period; the effective tick is the gcd of the
    /// active campaigns' publish intervals, clamped to this.
    pub max_tick_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_tick_ms: 1_000 }
    }
}

struct FetchRuntime {
    executions: u32,
    interval_start_ms: u64,
}

struct DeferredJob {
    event_id: EventId,
    due_monotonic_ms: u64,
    trigger_wall_ts_ms: u64,
}

/// Everything the engine tracks for one runnable campaign.
struct CampaignRuntime {
    campaign: Arc<Campaign>,
    active: bool,
    prev: bool,
    last_fire_ms: Option<u64>,
    /// Invocation maps per tree: [0] collect condition, then for each
    /// fetch spec i: [1 + 2i] condition, [2 + 2i] action
    tree_invocations: Vec<HashMap<u16, InvocationId>>,
    /// All custom-function call sites across the campaign's trees
    custom_sites: Vec<(SmolStr, InvocationId)>,
    fetch_state: Vec<FetchRuntime>,
    deferred: Option<DeferredJob>,
}

impl CampaignRuntime {
    fn new(campaign: Arc<Campaign>) -> Self {
        let mut tree_invocations = Vec::new();
        let mut custom_sites = Vec::new();
        let mut ordinal = 0u32;
        let mut add_tree = |tree: &ExpressionTree,
                            ordinal: u32,
                            sites: &mut Vec<(SmolStr, InvocationId)>| {
            let mut map = HashMap::new();
            for (index, node) in tree.iter().enumerate() {
                if let ExpressionNode::CustomFunction { name, .. } = node {
                    let id = invocation_id(&campaign.id, ordinal, index as u16);
                    map.insert(index as u16, id);
                    sites.push((name.clone(), id));
                }
            }
            map
        };

        tree_invocations.push(add_tree(&campaign.collect_condition, ordinal, &mut custom_sites));
        for fetch in &campaign.fetch_information {
            ordinal += 1;
            tree_invocations.push(add_tree(&fetch.condition, ordinal, &mut custom_sites));
            ordinal += 1;
            tree_invocations.push(add_tree(&fetch.action, ordinal, &mut custom_sites));
        }
        let fetch_state = campaign
            .fetch_information
            .iter()
            .map(|_| FetchRuntime { executions: 0, interval_start_ms: 0 })
            .collect();
        Self {
            campaign,
            active: false,
            prev: false,
            last_fire_ms: None,
            tree_invocations,
            custom_sites,
            fetch_state,
            deferred: None,
        }
    }
}

pub struct InspectionEngine<C: Clock> {
    buffer: SignalHistoryBuffer,
    registry: CustomFunctionRegistry,
    distributor: SignalBufferDistributor,
    campaigns_rx: watch::Receiver<Arc<CampaignSnapshot>>,
    sender: SenderHandle,
    clock: C,
    event_ids: EventIdGenerator,
    counters: Counters,
    config: EngineConfig,
    runtimes: HashMap<SyncId, CampaignRuntime>,
    snapshot: Arc<CampaignSnapshot>,
}

impl<C: Clock> InspectionEngine<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        distributor: SignalBufferDistributor,
        campaigns_rx: watch::Receiver<Arc<CampaignSnapshot>>,
        sender: SenderHandle,
        registry: CustomFunctionRegistry,
        clock: C,
        event_ids: EventIdGenerator,
        counters: Counters,
        config: EngineConfig,
    ) -> Self {
        Self {
            buffer: SignalHistoryBuffer::new(counters.clone()),
            registry,
            distributor,
            campaigns_rx,
            sender,
            clock,
            event_ids,
            counters,
            config,
            runtimes: HashMap::new(),
            snapshot: Arc::new(CampaignSnapshot::empty()),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            self.sync_campaigns();
            let sleep_ms = self.next_wake_ms();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = self.campaigns_rx.changed() => {
                    if changed.is_err() {
                        tracing::debug!("campaign snapshot source gone, stopping engine");
                        break;
                    }
                }
                _ = self.distributor.wait() => {}
                _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
            }
            self.sync_campaigns();
            self.ingest_pending();
            self.run_cycle().await;
        }
    }

    /// One ingest + evaluate pass. Public for deterministic tests; the
    /// task loop calls this on every wake.
    pub async fn step(&mut self) {
        self.sync_campaigns();
        self.ingest_pending();
        self.run_cycle().await;
    }

    /// Pick up a new campaign snapshot: drop runtimes for campaigns
    /// that left the runnable set (cleaning up their custom-function
    /// state), create runtimes for new ones, leave untouched campaigns
    /// alone (pointer identity), and resize the history buffer.
    fn sync_campaigns(&mut self) {
        let snapshot = self.campaigns_rx.borrow().clone();
        if Arc::ptr_eq(&snapshot, &self.snapshot) {
            return;
        }
        self.snapshot = snapshot;

        let eligible: HashMap<SyncId, Arc<Campaign>> = self
            .snapshot
            .eligible
            .iter()
            .map(|c| (c.id.clone(), c.clone()))
            .collect();

        let gone: Vec<SyncId> =
            self.runtimes.keys().filter(|id| !eligible.contains_key(*id)).cloned().collect();
        for id in gone {
            if let Some(mut runtime) = self.runtimes.remove(&id) {
                tracing::debug!(campaign = %id, "campaign left the runnable set");
                cleanup_runtime(&mut self.registry, &mut runtime);
            }
        }

        for (id, campaign) in eligible {
            let unchanged = self
                .runtimes
                .get(&id)
                .is_some_and(|runtime| Arc::ptr_eq(&runtime.campaign, &campaign));
            if unchanged {
                continue;
            }
            if let Some(mut old) = self.runtimes.remove(&id) {
                cleanup_runtime(&mut self.registry, &mut old);
            }
            tracing::debug!(campaign = %id, "campaign runtime created");
            self.runtimes.insert(id, CampaignRuntime::new(campaign));
        }

        self.buffer.reconcile(&self.retention_requirements());
    }

    /// Per-signal retention: the maximum over every campaign (runnable
    /// and idle) that references the signal. Idle campaigns keep their
    /// buffers so nothing is lost while a manifest swap is in flight.
    fn retention_requirements(&self) -> HashMap<SignalId, SignalRetention> {
        let mut requirements: HashMap<SignalId, SignalRetention> = HashMap::new();
        let mut merge = |id: SignalId, retention: SignalRetention| {
            requirements
                .entry(id)
                .and_modify(|existing| {
                    existing.window_ms = existing.window_ms.max(retention.window_ms);
                    existing.max_samples = existing.max_samples.max(retention.max_samples);
                })
                .or_insert(retention);
        };
        for campaign in self.snapshot.eligible.iter().chain(self.snapshot.idle.iter()) {
            for collect in &campaign.collect_signals {
                merge(collect.signal_id, collect.retention);
            }
            let mut trees: Vec<&ExpressionTree> = vec![&campaign.collect_condition];
            for fetch in &campaign.fetch_information {
                trees.push(&fetch.condition);
                trees.push(&fetch.action);
            }
            for tree in trees {
                for node in tree.iter() {
                    match node {
                        ExpressionNode::Window { signal_id, window_ms, .. } => merge(
                            *signal_id,
                            SignalRetention {
                                // prev_last needs the window before the
                                // current one too
                                window_ms: window_ms.saturating_mul(2),
                                max_samples: CONDITION_ONLY_SAMPLES,
                            },
                        ),
                        ExpressionNode::SignalRef { signal_id }
                        | ExpressionNode::LastReceptionTime { signal_id }
                        | ExpressionNode::IsNull { signal_id } => {
                            merge(*signal_id, SignalRetention { window_ms: 0, max_samples: 1 })
                        }
                        _ => {}
                    }
                }
            }
        }
        requirements
    }

    /// Type incoming samples against their dictionary type and store
    /// them. Strings are interned; kind mismatches are dropped and
    /// counted.
    fn ingest_pending(&mut self) {
        for decoded in self.distributor.drain() {
            let value = match decoded.value {
                DecodedValue::String(s) if decoded.signal_type == SignalType::String => {
                    SignalValue::String(self.buffer.intern(&s))
                }
                DecodedValue::String(_) => {
                    tracing::trace!(signal = %decoded.signal_id, "string sample for numeric signal");
                    self.counters.samples_dropped.increment();
                    continue;
                }
                other => match other.into_typed(decoded.signal_type) {
                    Some(value) => value,
                    None => {
                        self.counters.samples_dropped.increment();
                        continue;
                    }
                },
            };
            self.buffer.ingest(Sample::new(
                decoded.signal_id,
                decoded.monotonic_ts_ms,
                decoded.wall_ts_ms,
                value,
                decoded.source,
            ));
        }
    }

    async fn run_cycle(&mut self) {
        let now_monotonic_ms = self.clock.monotonic_ms();
        let now_epoch_ms = self.clock.epoch_ms();
        self.buffer.evict_expired(now_monotonic_ms);

        let mut order: Vec<SyncId> = self.runtimes.keys().cloned().collect();
        order.sort_by(|a, b| {
            let (pa, pb) = (
                self.runtimes.get(a).map(|r| r.campaign.priority).unwrap_or(u32::MAX),
                self.runtimes.get(b).map(|r| r.campaign.priority).unwrap_or(u32::MAX),
            );
            pa.cmp(&pb).then_with(|| a.cmp(b))
        });

        let mut payloads: Vec<Payload> = Vec::new();
        let buffer = &self.buffer;
        let registry = &mut self.registry;
        let counters = &self.counters;
        let event_ids = &self.event_ids;

        for id in order {
            let Some(runtime) = self.runtimes.get_mut(&id) else { continue };
            process_campaign(
                runtime,
                buffer,
                registry,
                counters,
                event_ids,
                now_monotonic_ms,
                now_epoch_ms,
                &mut payloads,
            );
        }

        // Condition-end hooks see the set of signals actually collected
        // this cycle and may append their own
        let collected: HashSet<SignalId> =
            payloads.iter().flat_map(|p| p.signals.iter().map(|s| s.signal_id)).collect();
        let mut output = CycleOutput { payloads };
        for runtime in self.runtimes.values().filter(|r| r.active) {
            for (name, invocation) in &runtime.custom_sites {
                self.registry.condition_end(
                    name,
                    *invocation,
                    &collected,
                    now_epoch_ms,
                    &mut output,
                );
            }
        }

        for payload in output.payloads {
            self.sender.submit(payload).await;
        }
    }

    /// How long to sleep when no data arrives: the gcd of the runnable
    /// campaigns' publish intervals capped to the configured maximum,
    /// shortened further for pending deferred assemblies.
    fn next_wake_ms(&self) -> u64 {
        let mut tick = self.config.max_tick_ms;
        let mut interval_gcd: Option<u64> = None;
        for runtime in self.runtimes.values() {
            let interval = runtime.campaign.min_publish_interval_ms;
            if interval > 0 {
                interval_gcd = Some(match interval_gcd {
                    Some(existing) => gcd(existing, interval),
                    None => interval,
                });
            }
        }
        if let Some(g) = interval_gcd {
            tick = tick.min(g);
        }
        let now = self.clock.monotonic_ms();
        for runtime in self.runtimes.values() {
            if let Some(job) = &runtime.deferred {
                tick = tick.min(job.due_monotonic_ms.saturating_sub(now));
            }
        }
        tick.clamp(1, self.config.max_tick_ms)
    }

    /// Test hook: the number of campaigns with live runtime state.
    pub fn runtime_count(&self) -> usize {
        self.runtimes.len()
    }
}

/// Runs each call site's cleanup hook, once: only campaigns that were
/// actually active had any invocations to clean up, and the flag flips
/// so expiry followed by removal cannot clean twice.
fn cleanup_runtime(registry: &mut CustomFunctionRegistry, runtime: &mut CampaignRuntime) {
    if !runtime.active {
        return;
    }
    runtime.active = false;
    runtime.deferred = None;
    for (name, invocation) in &runtime.custom_sites {
        registry.cleanup(name, *invocation);
    }
}

#[allow(clippy::too_many_arguments)]
fn process_campaign(
    runtime: &mut CampaignRuntime,
    buffer: &SignalHistoryBuffer,
    registry: &mut CustomFunctionRegistry,
    counters: &Counters,
    event_ids: &EventIdGenerator,
    now_monotonic_ms: u64,
    now_epoch_ms: u64,
    payloads: &mut Vec<Payload>,
) {
    let campaign = runtime.campaign.clone();

    // Wall-clock gates: before start (Pending) or past expiry (Expired)
    if now_epoch_ms < campaign.start_time_ms || now_epoch_ms >= campaign.expiry_time_ms {
        cleanup_runtime(registry, runtime);
        return;
    }
    if !runtime.active {
        // Entering Active: an immediately-true condition is a rising
        // edge
        runtime.active = true;
        runtime.prev = false;
    }

    // Deferred assembly due?
    if runtime.deferred.as_ref().is_some_and(|j| now_monotonic_ms >= j.due_monotonic_ms) {
        if let Some(job) = runtime.deferred.take() {
            payloads.push(assemble(
                &campaign,
                buffer,
                job.event_id,
                job.trigger_wall_ts_ms,
                now_monotonic_ms,
            ));
        }
    }

    // Fetch specs: condition gate, rate limit, side-effecting action
    for (index, fetch) in campaign.fetch_information.iter().enumerate() {
        let state = &mut runtime.fetch_state[index];
        if fetch.execution_interval_ms > 0
            && now_monotonic_ms.saturating_sub(state.interval_start_ms)
                >= fetch.execution_interval_ms
        {
            state.interval_start_ms = now_monotonic_ms;
            state.executions = 0;
        }
        let mut ctx = EvalContext {
            buffer,
            registry: &mut *registry,
            invocations: runtime.tree_invocations.get(1 + 2 * index),
            now_monotonic_ms,
            now_epoch_ms,
        };
        if !evaluate(&fetch.condition, &mut ctx).as_bool() {
            continue;
        }
        if fetch.max_execution_per_interval > 0
            && state.executions >= fetch.max_execution_per_interval
        {
            continue;
        }
        state.executions += 1;
        let mut ctx = EvalContext {
            buffer,
            registry: &mut *registry,
            invocations: runtime.tree_invocations.get(2 + 2 * index),
            now_monotonic_ms,
            now_epoch_ms,
        };
        // The action runs for its side effects; the value is discarded
        let result = evaluate(&fetch.action, &mut ctx);
        if result.code != EvalErrorCode::Successful {
            tracing::debug!(campaign = %campaign.id, code = ?result.code, "fetch action error");
            counters.fetch_errors.increment();
        }
    }

    // Collect condition
    let mut ctx = EvalContext {
        buffer,
        registry: &mut *registry,
        invocations: runtime.tree_invocations.first(),
        now_monotonic_ms,
        now_epoch_ms,
    };
    let cur = evaluate(&campaign.collect_condition, &mut ctx).as_bool();

    let rising_ok = !campaign.trigger_only_on_rising_edge || !runtime.prev;
    let interval_ok = runtime
        .last_fire_ms
        .map(|last| now_monotonic_ms.saturating_sub(last) >= campaign.min_publish_interval_ms)
        .unwrap_or(true);

    if cur && rising_ok && interval_ok {
        runtime.last_fire_ms = Some(now_monotonic_ms);
        let event_id = event_ids.next();
        tracing::debug!(campaign = %campaign.id, %event_id, "campaign fired");
        if campaign.after_duration_ms > 0 {
            if runtime.deferred.is_some() {
                counters.deferred_fires_dropped.increment();
            } else {
                runtime.deferred = Some(DeferredJob {
                    event_id,
                    due_monotonic_ms: now_monotonic_ms + campaign.after_duration_ms,
                    trigger_wall_ts_ms: now_epoch_ms,
                });
            }
        } else {
            payloads.push(assemble(&campaign, buffer, event_id, now_epoch_ms, now_monotonic_ms));
        }
    }
    runtime.prev = cur;
}

fn gcd(a: u64, b: u64) -> u64 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
