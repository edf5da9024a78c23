// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal identifiers and value types

use serde::{Deserialize, Serialize};

/// Opaque 32-bit signal identifier assigned by the decoder manifest.
///
/// Stable across manifest versions for the same signal definition; a
/// signal whose type changes gets a new ID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SignalId(pub u32);

impl SignalId {
    /// Sentinel for "no such signal"
    pub const INVALID: SignalId = SignalId(u32::MAX);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The wire type a signal is decoded to.
///
/// Each [`SignalId`] is bound to exactly one type in the active decoder
/// dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Bool,
    String,
}

impl SignalType {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, SignalType::String)
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
