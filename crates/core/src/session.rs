// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session record: a tenant's long-lived containerization
//! workflow state.

use crate::define_id;
use crate::labels::{validate_k8s_key, validate_k8s_value, validate_label, LabelError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

define_id! {
    /// Opaque session identifier, unique across the process and the
    /// persisted store. Immutable once created.
    pub struct SessionId("sess-");
}

/// Finite workflow stage. Transitions are monotonic within the normal
/// path but may jump to `Failed` from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Preflight,
    Analyze,
    Build,
    Scan,
    Deploy,
    Completed,
    Failed,
}

impl Stage {
    /// The normal-path successor of this stage, if any. Used to reject
    /// out-of-order transitions other than a jump to `Failed`.
    fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::Preflight),
            Stage::Preflight => Some(Stage::Analyze),
            Stage::Analyze => Some(Stage::Build),
            Stage::Build => Some(Stage::Scan),
            Stage::Scan => Some(Stage::Deploy),
            Stage::Deploy => Some(Stage::Completed),
            Stage::Completed | Stage::Failed => None,
        }
    }

    /// Whether `to` is a legal transition from `self`.
    pub fn can_transition_to(self, to: Stage) -> bool {
        if to == Stage::Failed {
            return true;
        }
        self.next() == Some(to) || self == to
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("disk usage {used} exceeds per-session ceiling {ceiling}")]
    OverSessionQuota { used: u64, ceiling: u64 },
    #[error("expiration {expiration} precedes creation {created}")]
    ExpirationBeforeCreation { created: u64, expiration: u64 },
    #[error("invalid stage transition from {from:?} to {to:?}")]
    IllegalStageTransition { from: Stage, to: Stage },
    #[error(transparent)]
    Label(#[from] LabelError),
}

/// A tenant's long-lived containerization workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(default)]
    pub schema_version: u32,
    pub workspace_dir: PathBuf,
    pub created_at_ms: u64,
    pub last_access_ms: u64,
    pub expiration_ms: u64,
    pub stage: Stage,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub analysis: Option<serde_json::Value>,
    #[serde(default)]
    pub artifact_paths: Vec<PathBuf>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub k8s_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub disk_usage_bytes: u64,
    #[serde(default)]
    pub error_count: u32,
}

pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// `session_ttl == 0` is treated as "never expire", so a client can opt a
/// session out of GC entirely rather than create one that is immediately
/// expired.
pub const NEVER_EXPIRES_MS: u64 = u64::MAX;

impl Session {
    pub fn new(id: SessionId, workspace_dir: PathBuf, now_ms: u64, ttl_ms: Option<u64>) -> Self {
        let expiration_ms = match ttl_ms {
            Some(0) | None => NEVER_EXPIRES_MS,
            Some(ttl) => now_ms.saturating_add(ttl),
        };
        Self {
            id,
            schema_version: SESSION_SCHEMA_VERSION,
            workspace_dir,
            created_at_ms: now_ms,
            last_access_ms: now_ms,
            expiration_ms,
            stage: Stage::Init,
            repo_url: None,
            analysis: None,
            artifact_paths: Vec::new(),
            labels: BTreeSet::new(),
            k8s_labels: BTreeMap::new(),
            disk_usage_bytes: 0,
            error_count: 0,
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expiration_ms != NEVER_EXPIRES_MS && now_ms > self.expiration_ms
    }

    pub fn transition_stage(&mut self, to: Stage) -> Result<(), SessionError> {
        if !self.stage.can_transition_to(to) {
            return Err(SessionError::IllegalStageTransition { from: self.stage, to });
        }
        self.stage = to;
        Ok(())
    }

    /// Validate invariants: expiration ≥ creation, every
    /// label satisfies the grammar. Disk-usage-vs-ceiling is enforced by
    /// the Workspace Quota Accountant, not here, since it needs the
    /// global sum.
    pub fn validate_invariants(&self) -> Result<(), SessionError> {
        if self.expiration_ms != NEVER_EXPIRES_MS && self.expiration_ms < self.created_at_ms {
            return Err(SessionError::ExpirationBeforeCreation {
                created: self.created_at_ms,
                expiration: self.expiration_ms,
            });
        }
        for label in &self.labels {
            validate_label(label)?;
        }
        for (k, v) in &self.k8s_labels {
            validate_k8s_key(k)?;
            validate_k8s_value(v)?;
        }
        Ok(())
    }

    pub fn add_label(&mut self, label: String) -> Result<(), SessionError> {
        validate_label(&label)?;
        self.labels.insert(label); // duplicate insert is a no-op
        Ok(())
    }

    pub fn remove_label(&mut self, label: &str) {
        self.labels.remove(label);
    }

    pub fn set_k8s_label(&mut self, key: String, value: String) -> Result<(), SessionError> {
        validate_k8s_key(&key)?;
        validate_k8s_value(&value)?;
        self.k8s_labels.insert(key, value);
        Ok(())
    }
}

/// Cheap metadata view for `ListSummaries` — avoids loading
/// the full analysis blob / artifact list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub stage: Stage,
    pub labels: BTreeSet<String>,
    pub last_access_ms: u64,
}

impl From<&Session> for SessionSummary {
    fn from(s: &Session) -> Self {
        Self { id: s.id, stage: s.stage, labels: s.labels.clone(), last_access_ms: s.last_access_ms }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
