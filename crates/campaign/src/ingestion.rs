// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing and validation of inbound cloud documents

use crate::decoder::{DecoderDictionary, DecoderManifest, ManifestError};
use crate::model::{CampaignError, CollectionSchemeList};

/// Parse and validate a collection scheme list. A single invalid
/// campaign rejects the whole document: the cloud re-sends complete
/// lists, so partial acceptance would leave the two sides disagreeing
/// about what is running.
pub fn parse_scheme_list(bytes: &[u8]) -> Result<CollectionSchemeList, CampaignError> {
    let list: CollectionSchemeList = serde_json::from_slice(bytes)?;
    for campaign in &list.campaigns {
        campaign.validate()?;
    }
    Ok(list)
}

/// Parse a decoder manifest and build its dictionary.
pub fn parse_manifest(bytes: &[u8]) -> Result<(DecoderManifest, DecoderDictionary), ManifestError> {
    let manifest: DecoderManifest = serde_json::from_slice(bytes)?;
    let dictionary = DecoderDictionary::from_manifest(&manifest)?;
    Ok((manifest, dictionary))
}

#[cfg(test)]
#[path = "ingestion_tests.rs"]
mod tests;
