// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-flight transport memory accounting
//!
//! Mirrors the memory manager the cloud SDK would otherwise provide:
//! every encoded message reserves its size before the send and releases
//! it when the reservation drops.

use crate::transport::TransportError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct HeapQuota {
    in_flight: Arc<AtomicUsize>,
    limit: usize,
}

impl HeapQuota {
    pub fn new(limit: usize) -> Self {
        Self { in_flight: Arc::new(AtomicUsize::new(0)), limit }
    }

    /// Reserve `bytes` of in-flight memory. Fails with `QuotaReached`
    /// when the reservation would exceed the limit.
    pub fn reserve(&self, bytes: usize) -> Result<HeapReservation, TransportError> {
        let mut current = self.in_flight.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_add(bytes);
            if next > self.limit {
                return Err(TransportError::QuotaReached);
            }
            match self.in_flight.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Ok(HeapReservation { quota: self.clone(), bytes });
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    fn release(&self, bytes: usize) {
        self.in_flight.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// RAII guard for a reservation
pub struct HeapReservation {
    quota: HeapQuota,
    bytes: usize,
}

impl Drop for HeapReservation {
    fn drop(&mut self) {
        self.quota.release(self.bytes);
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod tests;
