// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration
//!
//! Loaded from a TOML file at startup. Every option has a default so a
//! minimal config only needs `persistency_path`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Log verbosity, mapped onto the tracing filter by the agent binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Info,
    Warning,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

/// All recognized agent options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Root of all persisted state
    pub persistency_path: PathBuf,
    /// How often the sender retries persisted payloads while connected
    #[serde(default = "default_upload_retry_interval_ms")]
    pub persistency_upload_retry_interval_ms: u64,
    /// Campaign manager check-in cadence
    #[serde(default = "default_checkin_interval_ms")]
    pub checkin_interval_ms: u64,
    /// Sender's per-message chunking threshold
    #[serde(default = "default_max_send_size_bytes")]
    pub max_send_size_bytes: usize,
    /// Ceiling for in-flight transport memory
    #[serde(default = "default_max_sdk_heap_bytes")]
    pub max_sdk_heap_bytes: usize,
    /// Cap on the inspection engine tick period
    #[serde(default = "default_inspection_max_tick_ms")]
    pub inspection_max_tick_ms: u64,
    /// Global on-disk cap for the payload store
    #[serde(default = "default_payload_store_quota_bytes")]
    pub payload_store_quota_bytes: u64,
    #[serde(default)]
    pub log_level: LogLevel,
    /// Distributor queue capacity, per agent
    #[serde(default = "default_signal_queue_capacity")]
    pub signal_queue_capacity: usize,
    /// Ready-payload queue capacity between assembler and sender
    #[serde(default = "default_sender_queue_capacity")]
    pub sender_queue_capacity: usize,
    /// How long the assembler blocks on a full sender queue before dropping
    #[serde(default = "default_sender_block_timeout_ms")]
    pub sender_block_timeout_ms: u64,
    /// Initial backoff for connection (re)establishment
    #[serde(default = "default_retry_start_ms")]
    pub connect_retry_start_ms: u64,
    /// Backoff ceiling for connection (re)establishment
    #[serde(default = "default_retry_max_ms")]
    pub connect_retry_max_ms: u64,
}

fn default_upload_retry_interval_ms() -> u64 {
    10_000
}
fn default_checkin_interval_ms() -> u64 {
    60_000
}
fn default_max_send_size_bytes() -> usize {
    128 * 1024
}
fn default_max_sdk_heap_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_inspection_max_tick_ms() -> u64 {
    1_000
}
fn default_payload_store_quota_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_signal_queue_capacity() -> usize {
    1_000
}
fn default_sender_queue_capacity() -> usize {
    64
}
fn default_sender_block_timeout_ms() -> u64 {
    500
}
fn default_retry_start_ms() -> u64 {
    1_000
}
fn default_retry_max_ms() -> u64 {
    256_000
}

impl AgentConfig {
    /// Parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AgentConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// A config with defaults rooted at `persistency_path`; used by
    /// tests and embedders.
    pub fn with_persistency_path(persistency_path: impl Into<PathBuf>) -> Self {
        Self {
            persistency_path: persistency_path.into(),
            persistency_upload_retry_interval_ms: default_upload_retry_interval_ms(),
            checkin_interval_ms: default_checkin_interval_ms(),
            max_send_size_bytes: default_max_send_size_bytes(),
            max_sdk_heap_bytes: default_max_sdk_heap_bytes(),
            inspection_max_tick_ms: default_inspection_max_tick_ms(),
            payload_store_quota_bytes: default_payload_store_quota_bytes(),
            log_level: LogLevel::default(),
            signal_queue_capacity: default_signal_queue_capacity(),
            sender_queue_capacity: default_sender_queue_capacity(),
            sender_block_timeout_ms: default_sender_block_timeout_ms(),
            connect_retry_start_ms: default_retry_start_ms(),
            connect_retry_max_ms: default_retry_max_ms(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.persistency_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("persistency_path must not be empty".into()));
        }
        if self.inspection_max_tick_ms == 0 {
            return Err(ConfigError::Invalid("inspection_max_tick_ms must be > 0".into()));
        }
        if self.max_send_size_bytes == 0 {
            return Err(ConfigError::Invalid("max_send_size_bytes must be > 0".into()));
        }
        if self.sender_queue_capacity == 0 {
            return Err(ConfigError::Invalid("sender_queue_capacity must be > 0".into()));
        }
        if self.signal_queue_capacity == 0 {
            return Err(ConfigError::Invalid("signal_queue_capacity must be > 0".into()));
        }
        if self.connect_retry_start_ms == 0 || self.connect_retry_max_ms < self.connect_retry_start_ms
        {
            return Err(ConfigError::Invalid(
                "connect retry backoff must satisfy 0 < start <= max".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
