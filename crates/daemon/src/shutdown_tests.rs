use super::*;
use crate::job::JobExecutor;
use crate::transport::Handler as TransportHandler;
use async_trait::async_trait;
use ck_core::{FakeClock, JobId, SessionId, WorkspaceQuotaAccountant};
use ck_engine::Telemetry;
use ck_store::MemoryStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;
use tokio_util::sync::CancellationToken;

struct NoopTransport {
    accepting: AtomicBool,
}

impl NoopTransport {
    fn new() -> Self {
        Self { accepting: AtomicBool::new(true) }
    }
}

#[async_trait]
impl Transport for NoopTransport {
    fn set_handler(&self, _handler: Arc<dyn TransportHandler>) {}

    async fn serve(&self) -> Result<(), TaggedError> {
        Ok(())
    }

    async fn stop(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

struct SleepExecutor(StdDuration);

#[async_trait]
impl JobExecutor for SleepExecutor {
    async fn execute(&self, _job_id: &JobId, _session_id: Option<&SessionId>, input: Value, _cancel: CancellationToken) -> Result<Value, TaggedError> {
        tokio::time::sleep(self.0).await;
        Ok(input)
    }
}

struct Harness {
    coordinator: Arc<ShutdownCoordinator<FakeClock>>,
    jobs: Arc<JobManager<FakeClock>>,
}

async fn harness(job_duration: StdDuration) -> Harness {
    let clock = FakeClock::new();
    let store: Arc<dyn ck_store::KvStore> = Arc::new(MemoryStore::new());
    let quota = Arc::new(WorkspaceQuotaAccountant::new(1 << 30, 10 << 30));
    let sessions = Arc::new(
        SessionManager::new(store.clone(), clock.clone(), quota, std::path::PathBuf::from("/tmp/ck-shutdown-test"), 10, StdDuration::from_secs(3600))
            .await
            .unwrap(),
    );

    let mut executors: HashMap<String, Arc<dyn JobExecutor>> = HashMap::new();
    executors.insert("sleepy".to_string(), Arc::new(SleepExecutor(job_duration)));
    let jobs = Arc::new(JobManager::new(store.clone(), clock.clone(), executors, 2, 16, StdDuration::from_secs(3600)));
    jobs.start();

    let (telemetry, _rx) = Telemetry::new(clock);
    let transport: Arc<dyn Transport> = Arc::new(NoopTransport::new());
    let coordinator = Arc::new(ShutdownCoordinator::new(transport, store, sessions, jobs.clone(), Arc::new(telemetry)));

    Harness { coordinator, jobs }
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_running_job_then_succeeds() {
    let harness = harness(StdDuration::from_secs(2)).await;
    let job_id = harness.jobs.create("sleepy", None, json!({"n": 1})).await.unwrap();

    let coordinator = harness.coordinator.clone();
    let handle = tokio::spawn(async move { coordinator.shutdown(StdDuration::from_secs(5)).await });
    tokio::time::advance(StdDuration::from_secs(6)).await;
    let report = handle.await.unwrap();
    assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);

    let job = harness.jobs.get(&job_id).await.unwrap();
    assert_eq!(job.status, ck_core::JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn shutdown_reports_timeout_when_job_outlives_deadline() {
    let harness = harness(StdDuration::from_secs(30)).await;
    harness.jobs.create("sleepy", None, json!({"n": 1})).await.unwrap();

    let coordinator = harness.coordinator.clone();
    let handle = tokio::spawn(async move { coordinator.shutdown(StdDuration::from_millis(500)).await });
    tokio::time::advance(StdDuration::from_secs(2)).await;
    let report = handle.await.unwrap();
    assert!(!report.is_ok());
    assert!(report.errors.iter().any(|e| e.kind == ErrorKind::Timeout));
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent_under_repeated_calls() {
    let harness = harness(StdDuration::from_millis(10)).await;
    harness.jobs.create("sleepy", None, json!({"n": 1})).await.unwrap();

    let coordinator = harness.coordinator.clone();
    let handle = tokio::spawn(async move {
        let first = coordinator.shutdown(StdDuration::from_secs(5)).await;
        let second = coordinator.shutdown(StdDuration::from_secs(5)).await;
        (first, second, coordinator.already_shutdown())
    });
    tokio::time::advance(StdDuration::from_secs(2)).await;
    let (first, second, already) = handle.await.unwrap();
    assert_eq!(first.errors.len(), second.errors.len());
    assert!(already);
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_no_jobs_succeeds_quickly() {
    let harness = harness(StdDuration::from_secs(2)).await;
    let coordinator = harness.coordinator.clone();
    let handle = tokio::spawn(async move { coordinator.shutdown(StdDuration::from_secs(5)).await });
    tokio::time::advance(StdDuration::from_secs(6)).await;
    let report = handle.await.unwrap();
    assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
}
