// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoder manifest and the dictionary built from it
//!
//! The dictionary is an immutable snapshot shared by value: the
//! campaign manager builds a new one whenever a manifest arrives and
//! publishes it through a watch channel. Readers hold an `Arc` for the
//! duration of one work item; the previous snapshot dies with its last
//! reader.

use canopy_core::{SignalId, SignalType, SyncId};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;
use thiserror::Error;

/// Network interface name as configured on the vehicle (e.g. `vcan0`)
pub type InterfaceId = SmolStr;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("decoder manifest failed to parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("decoder manifest has an empty id")]
    EmptyId,
    #[error("manifest {id} binds the invalid signal id")]
    InvalidSignal { id: SyncId },
    #[error("manifest {id} binds signal {signal} to conflicting types")]
    ConflictingType { id: SyncId, signal: SignalId },
    #[error("manifest {id} defines duplicate name {name}")]
    DuplicateName { id: SyncId, name: SmolStr },
}

/// Extraction rule for one signal inside a CAN frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanSignalFormat {
    pub signal_id: SignalId,
    pub signal_type: SignalType,
    pub start_bit: u16,
    pub length_bits: u8,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub big_endian: bool,
    #[serde(default)]
    pub signed: bool,
}

fn default_factor() -> f64 {
    1.0
}

/// All signals of one CAN frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameFormat {
    pub signals: Vec<CanSignalFormat>,
}

/// One CAN frame binding inside a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanFrameEntry {
    pub interface_id: InterfaceId,
    pub frame_id: u32,
    #[serde(flatten)]
    pub format: FrameFormat,
}

/// Decoding rule for one OBD-II PID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidFormat {
    pub pid: u16,
    pub signal_id: SignalId,
    pub signal_type: SignalType,
    pub byte_offset: u8,
    pub num_bytes: u8,
    #[serde(default = "default_factor")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

/// Custom source decoding rule: an opaque decoder string scoped to an
/// interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomDecodedSignal {
    pub interface_id: InterfaceId,
    pub decoder: SmolStr,
    pub signal_id: SignalId,
    pub signal_type: SignalType,
}

/// Human-readable name binding used by named-signal sources and
/// actuator commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSignal {
    pub name: SmolStr,
    pub signal_id: SignalId,
    pub signal_type: SignalType,
}

/// The manifest document as it arrives from the cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderManifest {
    pub id: SyncId,
    #[serde(default)]
    pub can_frames: Vec<CanFrameEntry>,
    #[serde(default)]
    pub obd_pids: Vec<PidFormat>,
    #[serde(default)]
    pub custom_signals: Vec<CustomDecodedSignal>,
    #[serde(default)]
    pub named_signals: Vec<NamedSignal>,
}

/// Immutable lookup tables derived from a validated manifest.
#[derive(Debug)]
pub struct DecoderDictionary {
    id: SyncId,
    can_decode: HashMap<(InterfaceId, u32), FrameFormat>,
    obd_decode: HashMap<u16, PidFormat>,
    custom_decode: HashMap<InterfaceId, HashMap<SmolStr, (SignalId, SignalType)>>,
    named: HashMap<SmolStr, (SignalId, SignalType)>,
    reverse: HashMap<SignalId, SignalType>,
}

impl DecoderDictionary {
    pub fn from_manifest(manifest: &DecoderManifest) -> Result<Self, ManifestError> {
        if manifest.id.is_empty() {
            return Err(ManifestError::EmptyId);
        }
        let mut dictionary = Self {
            id: manifest.id.clone(),
            can_decode: HashMap::new(),
            obd_decode: HashMap::new(),
            custom_decode: HashMap::new(),
            named: HashMap::new(),
            reverse: HashMap::new(),
        };

        for frame in &manifest.can_frames {
            for signal in &frame.format.signals {
                dictionary.bind(signal.signal_id, signal.signal_type)?;
            }
            dictionary
                .can_decode
                .insert((frame.interface_id.clone(), frame.frame_id), frame.format.clone());
        }
        for pid in &manifest.obd_pids {
            dictionary.bind(pid.signal_id, pid.signal_type)?;
            dictionary.obd_decode.insert(pid.pid, pid.clone());
        }
        for custom in &manifest.custom_signals {
            dictionary.bind(custom.signal_id, custom.signal_type)?;
            dictionary
                .custom_decode
                .entry(custom.interface_id.clone())
                .or_default()
                .insert(custom.decoder.clone(), (custom.signal_id, custom.signal_type));
        }
        for named in &manifest.named_signals {
            dictionary.bind(named.signal_id, named.signal_type)?;
            if dictionary
                .named
                .insert(named.name.clone(), (named.signal_id, named.signal_type))
                .is_some()
            {
                return Err(ManifestError::DuplicateName {
                    id: manifest.id.clone(),
                    name: named.name.clone(),
                });
            }
        }
        Ok(dictionary)
    }

    fn bind(&mut self, signal_id: SignalId, signal_type: SignalType) -> Result<(), ManifestError> {
        if !signal_id.is_valid() {
            return Err(ManifestError::InvalidSignal { id: self.id.clone() });
        }
        match self.reverse.insert(signal_id, signal_type) {
            Some(previous) if previous != signal_type => {
                Err(ManifestError::ConflictingType { id: self.id.clone(), signal: signal_id })
            }
            _ => Ok(()),
        }
    }

    pub fn id(&self) -> &SyncId {
        &self.id
    }

    pub fn signal_type(&self, signal_id: SignalId) -> Option<SignalType> {
        self.reverse.get(&signal_id).copied()
    }

    pub fn contains(&self, signal_id: SignalId) -> bool {
        self.reverse.contains_key(&signal_id)
    }

    pub fn named_signal(&self, name: &str) -> Option<(SignalId, SignalType)> {
        self.named.get(name).copied()
    }

    pub fn can_frame(&self, interface_id: &str, frame_id: u32) -> Option<&FrameFormat> {
        self.can_decode.get(&(InterfaceId::new(interface_id), frame_id))
    }

    pub fn obd_pid(&self, pid: u16) -> Option<&PidFormat> {
        self.obd_decode.get(&pid)
    }

    pub fn custom_decoder(&self, interface_id: &str, decoder: &str) -> Option<(SignalId, SignalType)> {
        self.custom_decode.get(interface_id)?.get(decoder).copied()
    }

    /// Number of distinct signals the dictionary can decode.
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}

#[cfg(test)]
#[path = "decoder_tests.rs"]
mod tests;
