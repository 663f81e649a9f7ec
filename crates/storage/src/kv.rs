// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent KV store contract: atomic put/get/delete
//! plus prefix scan. Everything above this trait — the Session Manager,
//! Job Manager — is written against the trait, not a specific backend, so
//! the embedded engine choice stays swappable.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(String),
    #[error("key not found")]
    NotFound,
}

/// Durable bytes-to-bytes map with atomic put/get/delete and prefix scan
///.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    /// Iterate all key/value pairs whose key starts with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;
    /// Force durable bytes to disk. A no-op for stores that are always
    /// durable on `put`.
    async fn flush(&self) -> Result<(), StoreError>;
}
