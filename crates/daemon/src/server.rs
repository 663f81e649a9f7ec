// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bootstrap wiring: turns a loaded [`Config`] into a running
//! server — store, quota accountant, session/job managers, the tool
//! registry and orchestrator, the request handler, and the transport —
//! and owns the [`ShutdownCoordinator`] that unwinds all of it in order.

use crate::config::{Config, TransportType};
use crate::handler::RequestHandler;
use crate::job::{JobExecutor, JobManager};
use crate::session::SessionManager;
use crate::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::transport::{IoTransport, Transport};
use async_trait::async_trait;
use ck_core::{Clock, JobId, SessionId, SystemClock, TaggedError, WorkspaceQuotaAccountant};
use ck_engine::{BreakerRegistry, ExecutionContext, MiddlewareChain, Telemetry, ToolOrchestrator, ToolRegistry};
use ck_store::{KvStore, SledStore};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Tool kinds dispatched through the Job Manager rather than inline through the orchestrator. Mirrors
/// [`crate::handler`]'s allow-list; kept here too since the job executor
/// map is built independently of the handler's dispatch check.
const ASYNC_TOOL_KINDS: &[&str] = &["build_image", "push_image", "pull_image", "scan_image", "deploy_k8s"];

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("store error: {0}")]
    Store(String),
    #[error(transparent)]
    Internal(#[from] TaggedError),
    #[error("registry error: {0}")]
    Registry(#[from] ck_engine::RegistryError),
    #[error("transport error: {0}")]
    Transport(TaggedError),
}

/// Adapts a registered [`ck_engine::Tool`] to the [`JobExecutor`] contract
/// so the same orchestrator (breaker gate, middleware chain, retries)
/// backs both inline and job-dispatched calls. `job_id` and `cancel` are
/// not threaded into the tool call: none of the shipped tools poll for
/// cancellation mid-execution, and the job's own terminal state already
/// carries the id.
struct ToolJobExecutor<C: Clock> {
    orchestrator: Arc<ToolOrchestrator<C>>,
    tool_name: String,
}

#[async_trait]
impl<C: Clock> JobExecutor for ToolJobExecutor<C> {
    async fn execute(&self, job_id: &JobId, session_id: Option<&SessionId>, input: Value, _cancel: CancellationToken) -> Result<Value, TaggedError> {
        let args = match input {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("input".to_string(), other);
                map
            }
        };
        let mut ctx = ExecutionContext::new(format!("job-{job_id}"), self.tool_name.clone());
        if let Some(sid) = session_id {
            ctx = ctx.with_session(sid.to_string());
        }
        self.orchestrator.execute(ctx, &self.tool_name, args).await
    }
}

/// A fully wired, runnable server. Construction does all the bootstrap
/// work; [`Server::run`] hands control to the transport and
/// blocks until it stops, and [`Server::shutdown`] runs the ordered
/// teardown sequence.
pub struct Server<C: Clock = SystemClock> {
    config: Config,
    transport: Arc<dyn Transport>,
    shutdown: Arc<ShutdownCoordinator<C>>,
}

impl Server<SystemClock> {
    /// Builds a server over stdin/stdout using the system clock — the
    /// shape `bin/ckd.rs` constructs in production.
    pub async fn bootstrap_stdio(config: Config) -> Result<Self, ServerError> {
        Self::bootstrap(config, SystemClock, || {
            IoTransport::new(tokio::io::stdin(), tokio::io::stdout())
        })
        .await
    }
}

impl<C: Clock + 'static> Server<C> {
    /// Generic bootstrap, parameterized over the clock and the transport
    /// constructor so tests can swap in a [`ck_core::FakeClock`] and an
    /// in-memory duplex.
    pub async fn bootstrap<T, F>(config: Config, clock: C, make_transport: F) -> Result<Self, ServerError>
    where
        T: Transport + 'static,
        F: FnOnce() -> T,
    {
        let store: Arc<dyn KvStore> = Arc::new(SledStore::open(&config.store_path).map_err(|e| ServerError::Store(e.to_string()))?);
        let quota = Arc::new(WorkspaceQuotaAccountant::new(config.max_disk_per_session, config.total_disk_limit));

        let sessions = Arc::new(
            SessionManager::new(store.clone(), clock.clone(), quota.clone(), config.workspace_dir.clone(), config.max_sessions, config.session_ttl)
                .await?,
        );
        sessions.start_cleanup_routine(config.cleanup_interval);

        let registry = Arc::new(ToolRegistry::new());
        ck_tools::register_all(&registry, quota.clone())?;
        registry.freeze();

        let breakers = Arc::new(BreakerRegistry::new(clock.clone()));
        let (telemetry, _events) = Telemetry::new(clock.clone());
        let telemetry = Arc::new(telemetry);
        let middleware = Arc::new(MiddlewareChain::new(telemetry.clone()));
        let orchestrator = Arc::new(ToolOrchestrator::new(registry.clone(), breakers, middleware));

        let mut executors: std::collections::HashMap<String, Arc<dyn JobExecutor>> = std::collections::HashMap::new();
        for kind in ASYNC_TOOL_KINDS {
            if registry.lookup(kind).is_some() {
                executors.insert((*kind).to_string(), Arc::new(ToolJobExecutor { orchestrator: orchestrator.clone(), tool_name: (*kind).to_string() }));
            }
        }
        let jobs = Arc::new(JobManager::new(store.clone(), clock.clone(), executors, config.max_workers, config.job_queue_capacity, config.job_ttl));
        jobs.start();
        jobs.start_reaper(config.cleanup_interval);

        let handler = Arc::new(RequestHandler::new(sessions.clone(), jobs.clone(), orchestrator, registry, config.workspace_dir.clone(), config.api_key.clone()));

        let transport = Arc::new(make_transport());
        transport.set_handler(handler);
        let transport: Arc<dyn Transport> = transport;

        let shutdown = Arc::new(ShutdownCoordinator::new(transport.clone(), store, sessions, jobs, telemetry));

        Ok(Self { config, transport, shutdown })
    }

    /// Runs the transport loop until EOF or [`Server::shutdown`] stops it.
    pub async fn run(&self) -> Result<(), ServerError> {
        info!(transport = ?self.transport_kind(), "server accepting requests");
        self.transport.serve().await.map_err(ServerError::Transport)
    }

    fn transport_kind(&self) -> TransportType {
        self.config.transport_type
    }

    /// Runs the full ordered shutdown sequence.
    pub async fn shutdown(&self, deadline: Duration) -> ShutdownReport {
        self.shutdown.shutdown(deadline).await
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
