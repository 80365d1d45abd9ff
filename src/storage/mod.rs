// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persistence of the most recent key record.
//!
//! The record is written as pretty JSON to a temporary file next to the
//! target and renamed over it, so readers see either the previous document
//! or the new one. Writers are serialized; the last successful write wins.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::protocol::KeyRecord;

/// File-backed store for the latest [`KeyRecord`].
pub struct KeyStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store configured by `storage`, or `None` when persistence is off.
    pub fn from_config(storage: &StorageConfig) -> Option<Self> {
        storage.enabled.then(|| Self::new(&storage.path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored record.
    pub fn save(&self, record: &KeyRecord) -> Result<()> {
        let _guard = self.lock.lock();

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.tmp_path();
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!(
            path = %self.path.display(),
            key_length = record.length(),
            "Key saved"
        );
        Ok(())
    }

    /// Read the stored record, if any.
    ///
    /// A document whose counters disagree with its key is rejected.
    pub fn load_latest(&self) -> Result<Option<KeyRecord>> {
        let _guard = self.lock.lock();

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored key");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let record: KeyRecord = serde_json::from_str(&content)?;
        if !record.is_consistent() {
            return Err(Error::Serialization(format!(
                "stored key at {} is inconsistent",
                self.path.display()
            )));
        }
        Ok(Some(record))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "key".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
