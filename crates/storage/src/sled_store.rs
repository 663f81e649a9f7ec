// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sled`-backed implementation of [`KvStore`]. `sled` gives us atomic
//! single-key writes and ordered iteration for free, which is all the
//! prefix-scan contract needs.

use crate::kv::{KvStore, StoreError};
use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self { db })
    }

    #[cfg(test)]
    pub fn open_temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self { db })
    }
}

#[async_trait]
impl KvStore for SledStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let db = self.db.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || db.insert(key.as_bytes(), value))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let db = self.db.clone();
        let key = key.to_string();
        let value = tokio::task::spawn_blocking(move || db.get(key.as_bytes()))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let db = self.db.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || db.remove(key.as_bytes()))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let db = self.db.clone();
        let prefix = prefix.to_string();
        let entries = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            for item in db.scan_prefix(prefix.as_bytes()) {
                match item {
                    Ok((k, v)) => {
                        if let Ok(key) = String::from_utf8(k.to_vec()) {
                            out.push((key, v.to_vec()));
                        }
                    }
                    Err(e) => warn!(error = %e, "skipping unreadable sled entry during prefix scan"),
                }
            }
            out
        })
        .await
        .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(entries)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.flush())
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "sled_store_tests.rs"]
mod tests;
