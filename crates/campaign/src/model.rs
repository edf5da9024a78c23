// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Campaign documents
//!
//! Structural equality (`PartialEq`) is what reconciliation uses to
//! decide whether an arriving campaign is "the same" as a running one.

use canopy_core::{validate_tree, ExpressionTree, SignalId, SyncId, TreeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("collection scheme list failed to parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("campaign {id} is invalid: {reason}")]
    Invalid { id: SyncId, reason: String },
    #[error("campaign {id} has a malformed expression: {source}")]
    BadExpression {
        id: SyncId,
        #[source]
        source: TreeError,
    },
}

/// How much history a campaign wants for one collected signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRetention {
    pub window_ms: u64,
    pub max_samples: usize,
}

/// One entry of a campaign's collect list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectSignal {
    pub signal_id: SignalId,
    pub retention: SignalRetention,
}

/// A side-effecting fetch: when `condition` holds, `action` is
/// evaluated (typically a custom function that requests fresh data for
/// `signal_id`), rate-limited per execution interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSpec {
    pub signal_id: SignalId,
    pub condition: ExpressionTree,
    pub action: ExpressionTree,
    #[serde(default)]
    pub max_execution_per_interval: u32,
    #[serde(default)]
    pub execution_interval_ms: u64,
}

/// Store-and-forward hints; presence implies persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAndForwardConfig {
    pub max_bytes: u64,
    pub ttl_ms: u64,
}

/// A cloud-issued collection campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: SyncId,
    pub decoder_manifest_id: SyncId,
    pub start_time_ms: u64,
    pub expiry_time_ms: u64,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub min_publish_interval_ms: u64,
    #[serde(default)]
    pub after_duration_ms: u64,
    #[serde(default)]
    pub trigger_only_on_rising_edge: bool,
    pub collect_signals: Vec<CollectSignal>,
    pub collect_condition: ExpressionTree,
    #[serde(default)]
    pub fetch_information: Vec<FetchSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_and_forward: Option<StoreAndForwardConfig>,
}

impl Campaign {
    /// Whether fired payloads should survive transport outages.
    pub fn persists(&self) -> bool {
        self.persist || self.store_and_forward.is_some()
    }

    pub fn validate(&self) -> Result<(), CampaignError> {
        if self.id.is_empty() {
            return Err(CampaignError::Invalid {
                id: self.id.clone(),
                reason: "empty campaign id".into(),
            });
        }
        if self.decoder_manifest_id.is_empty() {
            return Err(CampaignError::Invalid {
                id: self.id.clone(),
                reason: "empty decoder manifest id".into(),
            });
        }
        if self.start_time_ms >= self.expiry_time_ms {
            return Err(CampaignError::Invalid {
                id: self.id.clone(),
                reason: format!(
                    "start {} is not before expiry {}",
                    self.start_time_ms, self.expiry_time_ms
                ),
            });
        }
        for collect in &self.collect_signals {
            if !collect.signal_id.is_valid() {
                return Err(CampaignError::Invalid {
                    id: self.id.clone(),
                    reason: "collect list references the invalid signal id".into(),
                });
            }
            if collect.retention.max_samples == 0 {
                return Err(CampaignError::Invalid {
                    id: self.id.clone(),
                    reason: format!("signal {} retains zero samples", collect.signal_id),
                });
            }
        }
        self.check_tree(&self.collect_condition)?;
        for fetch in &self.fetch_information {
            self.check_tree(&fetch.condition)?;
            self.check_tree(&fetch.action)?;
        }
        Ok(())
    }

    fn check_tree(&self, tree: &ExpressionTree) -> Result<(), CampaignError> {
        validate_tree(tree).map_err(|source| CampaignError::BadExpression {
            id: self.id.clone(),
            source,
        })
    }
}

/// The full campaign list as one document; arrival replaces the
/// previous list wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CollectionSchemeList {
    pub campaigns: Vec<Campaign>,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
