// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed codecs over the two persisted key prefixes: `sess/<id>` and
//! `job/<id>`.

use crate::kv::{KvStore, StoreError};
use ck_core::{Job, JobId, Session, SessionId};
use thiserror::Error;

const SESSION_PREFIX: &str = "sess/";
const JOB_PREFIX: &str = "job/";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("corrupt record at key {key}: {source}")]
    Decode { key: String, #[source] source: serde_json::Error },
}

fn session_key(id: &SessionId) -> String {
    format!("{SESSION_PREFIX}{id}")
}

fn job_key(id: &JobId) -> String {
    format!("{JOB_PREFIX}{id}")
}

pub async fn put_session(store: &dyn KvStore, session: &Session) -> Result<(), RecordError> {
    let bytes = serde_json::to_vec(session).map_err(|e| RecordError::Decode { key: session.id.to_string(), source: e })?;
    store.put(&session_key(&session.id), bytes).await?;
    Ok(())
}

pub async fn get_session(store: &dyn KvStore, id: &SessionId) -> Result<Option<Session>, RecordError> {
    let key = session_key(id);
    match store.get(&key).await? {
        Some(bytes) => {
            let session = serde_json::from_slice(&bytes).map_err(|e| RecordError::Decode { key, source: e })?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

pub async fn delete_session(store: &dyn KvStore, id: &SessionId) -> Result<(), RecordError> {
    store.delete(&session_key(id)).await?;
    Ok(())
}

pub async fn list_sessions(store: &dyn KvStore) -> Result<Vec<Session>, RecordError> {
    let entries = store.scan_prefix(SESSION_PREFIX).await?;
    let mut sessions = Vec::with_capacity(entries.len());
    for (key, bytes) in entries {
        let session = serde_json::from_slice(&bytes).map_err(|e| RecordError::Decode { key, source: e })?;
        sessions.push(session);
    }
    Ok(sessions)
}

pub async fn put_job(store: &dyn KvStore, job: &Job) -> Result<(), RecordError> {
    let bytes = serde_json::to_vec(job).map_err(|e| RecordError::Decode { key: job.id.to_string(), source: e })?;
    store.put(&job_key(&job.id), bytes).await?;
    Ok(())
}

pub async fn get_job(store: &dyn KvStore, id: &JobId) -> Result<Option<Job>, RecordError> {
    let key = job_key(id);
    match store.get(&key).await? {
        Some(bytes) => {
            let job = serde_json::from_slice(&bytes).map_err(|e| RecordError::Decode { key, source: e })?;
            Ok(Some(job))
        }
        None => Ok(None),
    }
}

pub async fn delete_job(store: &dyn KvStore, id: &JobId) -> Result<(), RecordError> {
    store.delete(&job_key(id)).await?;
    Ok(())
}

pub async fn list_jobs(store: &dyn KvStore) -> Result<Vec<Job>, RecordError> {
    let entries = store.scan_prefix(JOB_PREFIX).await?;
    let mut jobs = Vec::with_capacity(entries.len());
    for (key, bytes) in entries {
        let job = serde_json::from_slice(&bytes).map_err(|e| RecordError::Decode { key, source: e })?;
        jobs.push(job);
    }
    Ok(jobs)
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
