// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic check-in task
//!
//! Every interval, sends the list of currently-known document IDs. A
//! failed check-in is logged and retried at the next interval; there is
//! no backlog, the next one supersedes it anyway.

use crate::snapshot::CampaignSnapshot;
use async_trait::async_trait;
use canopy_core::{Clock, SyncId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
#[error("check-in failed: {0}")]
pub struct CheckinFailure(pub String);

/// Where check-ins go; the agent glues this to the transport.
#[async_trait]
pub trait CheckinSink: Send + Sync + 'static {
    async fn send_checkin(
        &self,
        timestamp_ms_epoch: u64,
        document_ids: Vec<SyncId>,
    ) -> Result<(), CheckinFailure>;
}

pub struct CheckinTask<S: CheckinSink, C: Clock> {
    sink: S,
    clock: C,
    interval_ms: u64,
    campaigns_rx: watch::Receiver<Arc<CampaignSnapshot>>,
}

impl<S: CheckinSink, C: Clock> CheckinTask<S, C> {
    pub fn new(
        sink: S,
        clock: C,
        interval_ms: u64,
        campaigns_rx: watch::Receiver<Arc<CampaignSnapshot>>,
    ) -> Self {
        Self { sink, clock, interval_ms, campaigns_rx }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(Duration::from_millis(self.interval_ms.max(1)));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tick.tick() => self.send_once().await,
            }
        }
    }

    /// One check-in with the IDs known right now. The snapshot is read
    /// at send time, never cached, so the list has no stale entries.
    pub async fn send_once(&self) {
        let ids = self.campaigns_rx.borrow().known_document_ids();
        let timestamp = self.clock.epoch_ms();
        match self.sink.send_checkin(timestamp, ids).await {
            Ok(()) => tracing::debug!("check-in sent"),
            Err(e) => tracing::warn!(error = %e, "check-in failed, will retry next interval"),
        }
    }
}

#[cfg(test)]
#[path = "checkin_tests.rs"]
mod tests;
