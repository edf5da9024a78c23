// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-file persistence for cloud documents
//!
//! The last accepted collection scheme list and decoder manifest are
//! kept as raw bytes under fixed filenames so startup can replay them
//! without waiting for the cloud.

use crate::StoreError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    CollectionSchemeList,
    DecoderManifest,
}

impl DocumentType {
    fn filename(&self) -> &'static str {
        match self {
            DocumentType::CollectionSchemeList => "CollectionSchemeList.bin",
            DocumentType::DecoderManifest => "DecoderManifest.bin",
        }
    }
}

/// Byte store for the two cloud documents.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Create the persistency root if needed. Failure here is fatal to
    /// startup; this is the one place the agent insists on a writable
    /// filesystem.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        Ok(Self { root: root.to_path_buf() })
    }

    /// Overwrite the stored document atomically.
    pub fn write(&self, ty: DocumentType, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.root.join(ty.filename());
        let tmp = self.root.join(format!("{}.tmp", ty.filename()));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// Read the stored document; `None` if it was never written.
    pub fn read(&self, ty: DocumentType) -> Result<Option<Vec<u8>>, StoreError> {
        let target = self.root.join(ty.filename());
        match std::fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the stored document if present.
    pub fn erase(&self, ty: DocumentType) -> Result<(), StoreError> {
        let target = self.root.join(ty.filename());
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
