// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Manager: session CRUD, TTL, persistence, GC,
//! and the label index, all mutated through a serialized per-id updater.
//! A 256-stripe lock table ([`StripeLocks`]) replaces the single global
//! lock a naive port would reach for, while still serializing writers to
//! the same id.

use crate::locks::StripeLocks;
use ck_core::{Clock, ErrorKind, Session, SessionError, SessionId, SessionSummary, SystemClock, TaggedError, WorkspaceQuotaAccountant};
use ck_store::{delete_session, get_session, list_sessions, put_session, KvStore};
use parking_lot::Mutex as SyncMutex;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcReport {
    pub scanned: usize,
    pub deleted: usize,
}

pub struct SessionManager<C: Clock = SystemClock> {
    store: Arc<dyn KvStore>,
    clock: C,
    quota: Arc<WorkspaceQuotaAccountant>,
    locks: StripeLocks,
    workspace_root: PathBuf,
    max_sessions: usize,
    default_ttl: Duration,
    known_ids: SyncMutex<HashSet<String>>,
    cleanup: SyncMutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl<C: Clock> SessionManager<C> {
    /// Recovers the known-id index from the store.
    pub async fn new(
        store: Arc<dyn KvStore>,
        clock: C,
        quota: Arc<WorkspaceQuotaAccountant>,
        workspace_root: PathBuf,
        max_sessions: usize,
        default_ttl: Duration,
    ) -> Result<Self, TaggedError> {
        let existing = list_sessions(store.as_ref())
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Internal, format!("cannot recover sessions: {e}")))?;
        let known_ids = existing.iter().map(|s| s.id.to_string()).collect();
        Ok(Self {
            store,
            clock,
            quota,
            locks: StripeLocks::new(),
            workspace_root,
            max_sessions,
            default_ttl,
            known_ids: SyncMutex::new(known_ids),
            cleanup: SyncMutex::new(None),
        })
    }

    fn ttl_ms(&self) -> Option<u64> {
        if self.default_ttl.is_zero() {
            None // ttl==0 means "never expire".
        } else {
            Some(self.default_ttl.as_millis() as u64)
        }
    }

    /// `GetOrCreate`: mints an id when `id` is empty,
    /// returns the existing record when one exists, otherwise creates a
    /// fresh record under the given id — subject to `MaxSessions`.
    pub async fn get_or_create(&self, id: &str) -> Result<Session, TaggedError> {
        let session_id = if id.is_empty() { SessionId::new() } else { SessionId::from_string(id) };
        let _guard = self.locks.lock(session_id.as_str()).await;

        if let Some(existing) = get_session(self.store.as_ref(), &session_id)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?
        {
            return Ok(existing);
        }

        {
            let mut ids = self.known_ids.lock();
            if ids.len() >= self.max_sessions {
                return Err(TaggedError::quota_exceeded(format!(
                    "at MaxSessions ceiling ({}), cannot create a new session",
                    self.max_sessions
                )));
            }
            ids.insert(session_id.to_string());
        }

        let workspace_dir = self.workspace_root.join(session_id.as_str());
        let session = Session::new(session_id, workspace_dir, self.clock.epoch_ms(), self.ttl_ms());
        if let Err(e) = put_session(self.store.as_ref(), &session).await {
            self.known_ids.lock().remove(session_id.as_str());
            return Err(TaggedError::new(ErrorKind::Internal, e.to_string()));
        }
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> Result<Session, TaggedError> {
        let session_id = SessionId::from_string(id);
        let _guard = self.locks.lock(session_id.as_str()).await;
        get_session(self.store.as_ref(), &session_id)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?
            .ok_or_else(|| TaggedError::not_found(format!("session {id} not found")))
    }

    /// Applies `mutator` under the id's stripe lock: load, mutate,
    /// revalidate, persist, in that order. A persistence failure leaves
    /// the stored record untouched — there is no separate in-memory copy
    /// to roll back.
    pub async fn update<F>(&self, id: &str, mutator: F) -> Result<Session, TaggedError>
    where
        F: FnOnce(&mut Session) -> Result<(), SessionError>,
    {
        let session_id = SessionId::from_string(id);
        let _guard = self.locks.lock(session_id.as_str()).await;

        let mut session = get_session(self.store.as_ref(), &session_id)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?
            .ok_or_else(|| TaggedError::not_found(format!("session {id} not found")))?;

        session.last_access_ms = self.clock.epoch_ms();
        mutator(&mut session).map_err(|e| TaggedError::invalid_argument(e.to_string()))?;
        session.validate_invariants().map_err(|e| TaggedError::invalid_argument(e.to_string()))?;

        put_session(self.store.as_ref(), &session).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        Ok(session)
    }

    /// `Delete`: removes the record and best-effort deletes
    /// the workspace directory; never fails on workspace cleanup errors.
    pub async fn delete(&self, id: &str) -> Result<(), TaggedError> {
        let session_id = SessionId::from_string(id);
        let _guard = self.locks.lock(session_id.as_str()).await;

        let existing = get_session(self.store.as_ref(), &session_id)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;

        delete_session(self.store.as_ref(), &session_id)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        self.known_ids.lock().remove(session_id.as_str());
        self.quota.remove_session(session_id.as_str());

        if let Some(session) = existing {
            if let Err(e) = tokio::fs::remove_dir_all(&session.workspace_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(session_id = %session_id, error = %e, "best-effort workspace cleanup failed");
                }
            }
        }
        Ok(())
    }

    /// `GarbageCollect`: deletes every session whose
    /// expiration has passed. `session_ttl == 0` sessions never expire
    /// (stored as [`ck_core::session::NEVER_EXPIRES_MS`]) and are skipped.
    pub async fn garbage_collect(&self) -> Result<GcReport, TaggedError> {
        let now = self.clock.epoch_ms();
        let sessions =
            list_sessions(self.store.as_ref()).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        let mut report = GcReport { scanned: sessions.len(), deleted: 0 };
        for session in sessions {
            if session.is_expired(now) {
                self.delete(session.id.as_str()).await?;
                report.deleted += 1;
            }
        }
        if report.deleted > 0 {
            info!(deleted = report.deleted, scanned = report.scanned, "session GC sweep");
        }
        Ok(report)
    }

    pub async fn list_summaries(&self) -> Result<Vec<SessionSummary>, TaggedError> {
        let sessions =
            list_sessions(self.store.as_ref()).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        Ok(sessions.iter().map(SessionSummary::from).collect())
    }

    pub async fn add_label(&self, id: &str, label: String) -> Result<Session, TaggedError> {
        self.update(id, move |s| s.add_label(label)).await
    }

    pub async fn remove_label(&self, id: &str, label: &str) -> Result<Session, TaggedError> {
        let label = label.to_string();
        self.update(id, move |s| {
            s.remove_label(&label);
            Ok(())
        })
        .await
    }

    pub async fn set_labels(&self, id: &str, labels: BTreeSet<String>) -> Result<Session, TaggedError> {
        self.update(id, move |s| {
            for label in &labels {
                ck_core::validate_label(label)?;
            }
            s.labels = labels;
            Ok(())
        })
        .await
    }

    /// Union of every session's labels across the process.
    pub async fn get_all_labels(&self) -> Result<BTreeSet<String>, TaggedError> {
        let sessions =
            list_sessions(self.store.as_ref()).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        Ok(sessions.into_iter().flat_map(|s| s.labels).collect())
    }

    pub fn session_count(&self) -> usize {
        self.known_ids.lock().len()
    }
}

impl<C: Clock + 'static> SessionManager<C> {
    /// Spawns the background GC ticker. Idempotent: calling
    /// it twice replaces the prior ticker after stopping it.
    pub fn start_cleanup_routine(self: &Arc<Self>, interval: Duration) {
        self.stop_cleanup_routine_sync();
        let token = CancellationToken::new();
        let manager = Arc::clone(self);
        let child_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = child_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = manager.garbage_collect().await {
                            warn!(error = %e, "session GC sweep failed");
                        }
                    }
                }
            }
        });
        *self.cleanup.lock() = Some((token, handle));
    }

    fn stop_cleanup_routine_sync(&self) {
        if let Some((token, _handle)) = self.cleanup.lock().take() {
            token.cancel();
        }
    }

    /// `Stop`: stops the ticker and flushes the store.
    pub async fn stop(&self) -> Result<(), TaggedError> {
        let handle = self.cleanup.lock().take();
        if let Some((token, handle)) = handle {
            token.cancel();
            let _ = handle.await;
        }
        self.store.flush().await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
