// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ck-store: the persistent KV store contract and
//! the typed codecs the Session Manager and Job Manager build on.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod kv;
pub mod memory_store;
pub mod records;
mod sled_store;

pub use kv::{KvStore, StoreError};
pub use memory_store::MemoryStore;
pub use records::{
    delete_job, delete_session, get_job, get_session, list_jobs, list_sessions, put_job,
    put_session, RecordError,
};
pub use sled_store::SledStore;
