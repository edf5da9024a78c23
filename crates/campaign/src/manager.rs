// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Campaign manager task
//!
//! Single owner of the campaign and manifest registries. Consumes
//! inbound document bytes, validates them, persists the accepted bytes,
//! and publishes fresh snapshots of the dictionary and the campaign set
//! through watch channels. Rejected documents leave prior state intact.

use crate::decoder::DecoderDictionary;
use crate::ingestion::{parse_manifest, parse_scheme_list};
use crate::model::Campaign;
use crate::snapshot::CampaignSnapshot;
use canopy_core::Counters;
use canopy_store::{DocumentStore, DocumentType};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Inbound document bytes, as received from the cloud.
#[derive(Debug, Clone)]
pub enum InboundDocument {
    SchemeList(Vec<u8>),
    Manifest(Vec<u8>),
}

/// Producer side for the transport receiver.
#[derive(Clone)]
pub struct DocumentHandle {
    tx: mpsc::Sender<InboundDocument>,
}

impl DocumentHandle {
    /// Forward a document to the manager; drops (with a log line) when
    /// the manager's queue is full, the cloud re-sends documents.
    pub fn submit(&self, document: InboundDocument) {
        if let Err(e) = self.tx.try_send(document) {
            tracing::warn!(error = %e, "campaign manager queue full, dropping document");
        }
    }
}

pub struct CampaignManager {
    rx: mpsc::Receiver<InboundDocument>,
    documents: DocumentStore,
    dictionary_tx: watch::Sender<Option<Arc<DecoderDictionary>>>,
    campaigns_tx: watch::Sender<Arc<CampaignSnapshot>>,
    /// Full campaign list as last accepted, keyed by nothing: order is
    /// the cloud's order
    schemes: Vec<Arc<Campaign>>,
    dictionary: Option<Arc<DecoderDictionary>>,
    counters: Counters,
}

impl CampaignManager {
    #[allow(clippy::type_complexity)]
    pub fn new(
        documents: DocumentStore,
        counters: Counters,
    ) -> (
        Self,
        DocumentHandle,
        watch::Receiver<Option<Arc<DecoderDictionary>>>,
        watch::Receiver<Arc<CampaignSnapshot>>,
    ) {
        let (tx, rx) = mpsc::channel(16);
        let (dictionary_tx, dictionary_rx) = watch::channel(None);
        let (campaigns_tx, campaigns_rx) = watch::channel(Arc::new(CampaignSnapshot::empty()));
        (
            Self {
                rx,
                documents,
                dictionary_tx,
                campaigns_tx,
                schemes: Vec::new(),
                dictionary: None,
                counters,
            },
            DocumentHandle { tx },
            dictionary_rx,
            campaigns_rx,
        )
    }

    /// Replay persisted documents. Corrupt or rejected files are logged
    /// and ignored; the agent then starts empty and waits for the cloud.
    pub fn restore(&mut self) {
        match self.documents.read(DocumentType::DecoderManifest) {
            Ok(Some(bytes)) => self.apply_manifest(&bytes, false),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read persisted manifest"),
        }
        match self.documents.read(DocumentType::CollectionSchemeList) {
            Ok(Some(bytes)) => self.apply_scheme_list(&bytes, false),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read persisted scheme list"),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        self.restore();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                maybe = self.rx.recv() => match maybe {
                    Some(InboundDocument::SchemeList(bytes)) => self.apply_scheme_list(&bytes, true),
                    Some(InboundDocument::Manifest(bytes)) => self.apply_manifest(&bytes, true),
                    None => break,
                },
            }
        }
    }

    fn apply_scheme_list(&mut self, bytes: &[u8], persist: bool) {
        let list = match parse_scheme_list(bytes) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting collection scheme list");
                self.counters.campaigns_rejected.increment();
                return;
            }
        };

        // Keep the Arc of structurally identical campaigns so engine
        // runtime state survives a no-op reconcile.
        let previous = std::mem::take(&mut self.schemes);
        self.schemes = list
            .campaigns
            .into_iter()
            .map(|incoming| {
                match previous.iter().find(|p| ***p == incoming) {
                    Some(existing) => existing.clone(),
                    None => Arc::new(incoming),
                }
            })
            .collect();

        tracing::info!(campaigns = self.schemes.len(), "collection scheme list accepted");
        if persist {
            if let Err(e) = self.documents.write(DocumentType::CollectionSchemeList, bytes) {
                tracing::warn!(error = %e, "failed to persist scheme list");
                self.counters.persist_failures.increment();
            }
        }
        self.publish();
    }

    fn apply_manifest(&mut self, bytes: &[u8], persist: bool) {
        let (_, dictionary) = match parse_manifest(bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting decoder manifest");
                self.counters.manifests_rejected.increment();
                return;
            }
        };

        let dictionary = Arc::new(dictionary);
        tracing::info!(manifest = %dictionary.id(), signals = dictionary.len(), "decoder manifest accepted");
        self.dictionary = Some(dictionary.clone());
        if persist {
            if let Err(e) = self.documents.write(DocumentType::DecoderManifest, bytes) {
                tracing::warn!(error = %e, "failed to persist manifest");
                self.counters.persist_failures.increment();
            }
        }
        let _ = self.dictionary_tx.send(Some(dictionary));
        self.publish();
    }

    /// Partition campaigns by manifest alignment and publish. Campaigns
    /// may arrive before their manifest or vice versa; idle ones wake up
    /// on the next publish after their manifest lands.
    fn publish(&mut self) {
        let manifest_id = self.dictionary.as_ref().map(|d| d.id().clone());
        let mut snapshot = CampaignSnapshot {
            manifest_id: manifest_id.clone(),
            eligible: Vec::new(),
            idle: Vec::new(),
        };
        for campaign in &self.schemes {
            if Some(&campaign.decoder_manifest_id) == manifest_id.as_ref() {
                snapshot.eligible.push(campaign.clone());
            } else {
                tracing::debug!(
                    campaign = %campaign.id,
                    wants = %campaign.decoder_manifest_id,
                    "campaign idle: manifest not active"
                );
                snapshot.idle.push(campaign.clone());
            }
        }
        let _ = self.campaigns_tx.send(Arc::new(snapshot));
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
