// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! canopy-store: on-disk persistence for documents and payloads
//!
//! Everything under the persistency root is written atomically
//! (temp + rename) and read defensively: a corrupt file is logged and
//! treated as absent, never as a fatal error.

mod documents;
mod payloads;

pub use documents::{DocumentStore, DocumentType};
pub use payloads::{PayloadMeta, PayloadStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("payload store quota exhausted")]
    MemoryFull,
}
