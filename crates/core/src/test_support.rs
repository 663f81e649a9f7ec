// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across crates (enabled via `test-support` feature).

use crate::job::{Job, JobId};
use crate::session::{Session, SessionId};
use std::path::PathBuf;

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::job::JobStatus;
    use proptest::prelude::*;

    pub fn arb_job_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Pending),
            Just(JobStatus::Running),
            Just(JobStatus::Completed),
            Just(JobStatus::Failed),
            Just(JobStatus::Canceled),
        ]
    }
}

/// Build a `Session` with sensible test defaults, overriding only what a
/// test cares about.
pub struct SessionBuilder {
    id: SessionId,
    workspace_dir: PathBuf,
    now_ms: u64,
    ttl_ms: Option<u64>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self { id: SessionId::new(), workspace_dir: PathBuf::from("/tmp/ck-test"), now_ms: 1_000, ttl_ms: None }
    }

    pub fn id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    pub fn now_ms(mut self, now_ms: u64) -> Self {
        self.now_ms = now_ms;
        self
    }

    pub fn ttl_ms(mut self, ttl_ms: Option<u64>) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn build(self) -> Session {
        Session::new(self.id, self.workspace_dir, self.now_ms, self.ttl_ms)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `Job` with sensible test defaults.
pub struct JobBuilder {
    id: JobId,
    kind: String,
    session_id: Option<SessionId>,
    input: serde_json::Value,
    now_ms: u64,
}

impl JobBuilder {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            kind: kind.into(),
            session_id: None,
            input: serde_json::json!({}),
            now_ms: 1_000,
        }
    }

    pub fn session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    pub fn now_ms(mut self, now_ms: u64) -> Self {
        self.now_ms = now_ms;
        self
    }

    pub fn build(self) -> Job {
        Job::new(self.id, self.kind, self.session_id, self.input, self.now_ms)
    }
}
