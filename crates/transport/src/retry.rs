// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential-backoff retry driver
//!
//! One driver per retried subject (connection establishment, for
//! instance). The subject is retried until it reports `Success` or
//! `Abort`; the driver then parks until `restart()` is called, which
//! also resets the backoff to its starting value.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStatus {
    Success,
    Retry,
    Abort,
}

/// A unit of work the driver keeps attempting.
#[async_trait]
pub trait Retryable: Send + 'static {
    async fn attempt(&mut self) -> RetryStatus;
}

/// Handle for waking a parked driver.
#[derive(Clone)]
pub struct RetryHandle {
    restart: Arc<Notify>,
}

impl RetryHandle {
    /// Reset the backoff and run the subject again as soon as possible.
    pub fn restart(&self) {
        self.restart.notify_one();
    }
}

pub struct RetryDriver {
    start_backoff_ms: u64,
    max_backoff_ms: u64,
    restart: Arc<Notify>,
}

impl RetryDriver {
    pub fn new(start_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            start_backoff_ms: start_backoff_ms.max(1),
            max_backoff_ms: max_backoff_ms.max(start_backoff_ms.max(1)),
            restart: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> RetryHandle {
        RetryHandle { restart: self.restart.clone() }
    }

    /// Drive the subject until cancellation.
    pub async fn run<R: Retryable>(self, mut subject: R, cancel: CancellationToken) {
        let mut backoff_ms = self.start_backoff_ms;
        loop {
            let status = subject.attempt().await;
            match status {
                RetryStatus::Retry => {
                    tracing::trace!(backoff_ms, "retrying after backoff");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_millis(backoff_ms)) => {}
                        _ = self.restart.notified() => {
                            backoff_ms = self.start_backoff_ms;
                            continue;
                        }
                    }
                    backoff_ms = (backoff_ms * 2).min(self.max_backoff_ms);
                }
                RetryStatus::Success | RetryStatus::Abort => {
                    tracing::trace!(?status, "retry subject finished, parking");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = self.restart.notified() => {
                            backoff_ms = self.start_backoff_ms;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
