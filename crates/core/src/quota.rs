// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace Quota Accountant: per-session disk usage plus
//! a running global sum, guarded by one lock (no per-id striping needed —
//! every `Add` touches the shared total, so a single lock is both simpler
//! and no more contended than a striped one would be on the hot path).
//!
//! Lives in `ck-core` rather than the daemon so that `ck-tools`, which
//! must charge bytes to the accountant before they touch disk, can depend
//! on it without a cycle back through `ck-daemon`.

use crate::error::TaggedError;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaStats {
    pub total_bytes_used: u64,
    pub session_count: usize,
}

struct Inner {
    bytes_used: HashMap<String, u64>,
    total: u64,
}

pub struct WorkspaceQuotaAccountant {
    per_session_ceiling: u64,
    global_ceiling: u64,
    inner: Mutex<Inner>,
}

impl WorkspaceQuotaAccountant {
    pub fn new(per_session_ceiling: u64, global_ceiling: u64) -> Self {
        Self {
            per_session_ceiling,
            global_ceiling,
            inner: Mutex::new(Inner { bytes_used: HashMap::new(), total: 0 }),
        }
    }

    /// Apply `delta` (signed) to `session_id`'s usage. Positive deltas are
    /// rejected with *quota-exceeded* if they would push the session past
    /// its ceiling or the process past the global ceiling; the counter is
    /// left unchanged in that case. Negative deltas always succeed and the
    /// per-session counter never goes below zero.
    pub fn add(&self, session_id: &str, delta: i64) -> Result<u64, TaggedError> {
        let mut inner = self.inner.lock();
        let current = inner.bytes_used.get(session_id).copied().unwrap_or(0);

        if delta >= 0 {
            let delta = delta as u64;
            let new_session_total = current.saturating_add(delta);
            if new_session_total > self.per_session_ceiling {
                return Err(TaggedError::quota_exceeded(format!(
                    "session {session_id} would use {new_session_total} bytes, exceeding the {} byte per-session ceiling",
                    self.per_session_ceiling
                )));
            }
            let new_global_total = inner.total.saturating_add(delta);
            if new_global_total > self.global_ceiling {
                return Err(TaggedError::quota_exceeded(format!(
                    "would push global disk usage to {new_global_total} bytes, exceeding the {} byte ceiling",
                    self.global_ceiling
                )));
            }
            inner.bytes_used.insert(session_id.to_string(), new_session_total);
            inner.total = new_global_total;
            Ok(new_session_total)
        } else {
            let shrink = delta.unsigned_abs();
            let new_session_total = current.saturating_sub(shrink);
            let actual_shrink = current - new_session_total;
            inner.total = inner.total.saturating_sub(actual_shrink);
            if new_session_total == 0 {
                inner.bytes_used.remove(session_id);
            } else {
                inner.bytes_used.insert(session_id.to_string(), new_session_total);
            }
            Ok(new_session_total)
        }
    }

    /// Remove a session's accounting entirely (on session delete), without
    /// requiring the caller to know its exact current usage.
    pub fn remove_session(&self, session_id: &str) {
        let mut inner = self.inner.lock();
        if let Some(used) = inner.bytes_used.remove(session_id) {
            inner.total = inner.total.saturating_sub(used);
        }
    }

    pub fn usage(&self, session_id: &str) -> u64 {
        self.inner.lock().bytes_used.get(session_id).copied().unwrap_or(0)
    }

    pub fn stats(&self) -> QuotaStats {
        let inner = self.inner.lock();
        QuotaStats { total_bytes_used: inner.total, session_count: inner.bytes_used.len() }
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod tests;
