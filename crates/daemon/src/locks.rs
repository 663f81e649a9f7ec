// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Striped lock table: serializes concurrent mutations
//! to the same id without a single global lock. Sized 256 stripes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

pub const STRIPE_COUNT: usize = 256;

/// A fixed-size table of async mutexes. Two ids that hash to the same
/// stripe serialize against each other even though they're otherwise
/// unrelated; the only correctness requirement is that
/// writers to the *same* id always serialize, which a hash collision
/// only makes stricter, never weaker.
pub struct StripeLocks {
    stripes: Vec<Mutex<()>>,
}

impl StripeLocks {
    pub fn new() -> Self {
        Self::with_stripes(STRIPE_COUNT)
    }

    pub fn with_stripes(count: usize) -> Self {
        let mut stripes = Vec::with_capacity(count.max(1));
        for _ in 0..count.max(1) {
            stripes.push(Mutex::new(()));
        }
        Self { stripes }
    }

    fn stripe_index(&self, id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() as usize) % self.stripes.len()
    }

    /// Acquire the stripe guarding `id`. Holding the guard serializes all
    /// other callers locking the same (or a colliding) id.
    pub async fn lock(&self, id: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_index(id)].lock().await
    }
}

impl Default for StripeLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
