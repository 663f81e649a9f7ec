// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool registry: name→tool binding, read-mostly after
//! bootstrap. Registration after the registry is frozen returns
//! `registry-frozen` — the decided answer to the open question of what
//! `RegisterTool` should do once the server has left bootstrap.

use crate::tool::{Tool, ToolMetadata};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool {0} is already registered")]
    Duplicate(String),
    #[error("registry is frozen, cannot register {0}")]
    Frozen(String),
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Mutex<HashMap<String, Arc<dyn Tool>>>,
    frozen: AtomicBool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.metadata().name;
        if self.frozen.load(Ordering::Acquire) {
            return Err(RegistryError::Frozen(name));
        }
        let mut tools = self.tools.lock();
        if tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tools.insert(name, tool);
        Ok(())
    }

    /// Freezes the registry. Called once bootstrap wiring completes;
    /// subsequent `register` calls fail with `Frozen`.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.lock().get(name).cloned()
    }

    pub fn metadata(&self, name: &str) -> Option<ToolMetadata> {
        self.tools.lock().get(name).map(|t| t.metadata())
    }

    pub fn list(&self) -> Vec<ToolMetadata> {
        self.tools.lock().values().map(|t| t.metadata()).collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
