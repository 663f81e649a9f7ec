use super::*;
use ck_core::{FakeClock, Stage};
use ck_store::MemoryStore;
use std::time::Duration as StdDuration;

async fn manager(max_sessions: usize) -> (SessionManager<FakeClock>, Arc<WorkspaceQuotaAccountant>) {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let quota = Arc::new(WorkspaceQuotaAccountant::new(1 << 30, 10 << 30));
    let clock = FakeClock::new();
    let manager = SessionManager::new(store, clock, Arc::clone(&quota), PathBuf::from("/tmp/ck-test-ws"), max_sessions, StdDuration::from_secs(3600))
        .await
        .expect("new");
    (manager, quota)
}

#[tokio::test]
async fn get_or_create_mints_id_when_empty() {
    let (manager, _quota) = manager(10).await;
    let session = manager.get_or_create("").await.expect("create");
    assert!(!session.id.is_empty());
    assert_eq!(session.stage, Stage::Init);
}

#[tokio::test]
async fn get_or_create_is_idempotent_for_existing_id() {
    let (manager, _quota) = manager(10).await;
    let first = manager.get_or_create("").await.expect("create");
    let second = manager.get_or_create(first.id.as_str()).await.expect("get existing");
    assert_eq!(first.id, second.id);
    assert_eq!(manager.session_count(), 1);
}

#[tokio::test]
async fn get_or_create_enforces_max_sessions() {
    let (manager, _quota) = manager(2).await;
    let s1 = manager.get_or_create("").await.expect("create 1");
    let _s2 = manager.get_or_create("").await.expect("create 2");
    let err = manager.get_or_create("").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    assert_eq!(manager.session_count(), 2);

    manager.delete(s1.id.as_str()).await.expect("delete");
    let s3 = manager.get_or_create("").await.expect("create after delete");
    assert_ne!(s3.id, s1.id);
}

#[tokio::test]
async fn get_missing_session_is_not_found() {
    let (manager, _quota) = manager(10).await;
    let err = manager.get("sess-doesnotexist0000000").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn update_applies_mutation_and_persists() {
    let (manager, _quota) = manager(10).await;
    let session = manager.get_or_create("").await.expect("create");
    let updated = manager.update(session.id.as_str(), |s| s.transition_stage(Stage::Preflight)).await.expect("update");
    assert_eq!(updated.stage, Stage::Preflight);

    let reloaded = manager.get(session.id.as_str()).await.expect("get");
    assert_eq!(reloaded.stage, Stage::Preflight, "a Get after Update must observe the mutation");
}

#[tokio::test]
async fn update_rejects_illegal_stage_transition() {
    let (manager, _quota) = manager(10).await;
    let session = manager.get_or_create("").await.expect("create");
    let err = manager.update(session.id.as_str(), |s| s.transition_stage(Stage::Deploy)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    let reloaded = manager.get(session.id.as_str()).await.expect("get");
    assert_eq!(reloaded.stage, Stage::Init, "a rejected update must not mutate the stored record");
}

#[tokio::test]
async fn delete_removes_record() {
    let (manager, _quota) = manager(10).await;
    let session = manager.get_or_create("").await.expect("create");
    manager.delete(session.id.as_str()).await.expect("delete");
    let err = manager.get(session.id.as_str()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn garbage_collect_deletes_expired_sessions_only() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let quota = Arc::new(WorkspaceQuotaAccountant::new(1 << 30, 10 << 30));
    let clock = FakeClock::new();
    let manager = SessionManager::new(store, clock.clone(), quota, PathBuf::from("/tmp/ck-test-ws"), 10, StdDuration::from_secs(10))
        .await
        .expect("new");

    let expiring = manager.get_or_create("").await.expect("create expiring");
    clock.advance(StdDuration::from_secs(3600));
    let fresh = manager.get_or_create("").await.expect("create fresh");

    let report = manager.garbage_collect().await.expect("gc");
    assert_eq!(report.scanned, 2);
    assert_eq!(report.deleted, 1);

    assert!(manager.get(expiring.id.as_str()).await.is_err());
    assert!(manager.get(fresh.id.as_str()).await.is_ok());
}

#[tokio::test]
async fn never_expires_sessions_survive_gc() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let quota = Arc::new(WorkspaceQuotaAccountant::new(1 << 30, 10 << 30));
    let clock = FakeClock::new();
    let manager = SessionManager::new(store, clock.clone(), quota, PathBuf::from("/tmp/ck-test-ws"), 10, StdDuration::ZERO)
        .await
        .expect("new");

    let session = manager.get_or_create("").await.expect("create");
    clock.advance(StdDuration::from_secs(365 * 24 * 60 * 60));
    let report = manager.garbage_collect().await.expect("gc");
    assert_eq!(report.deleted, 0);
    assert!(manager.get(session.id.as_str()).await.is_ok());
}

#[tokio::test]
async fn label_ops_enforce_grammar_and_dedupe() {
    let (manager, _quota) = manager(10).await;
    let session = manager.get_or_create("").await.expect("create");

    let updated = manager.add_label(session.id.as_str(), "app.name".to_string()).await.expect("add label");
    assert!(updated.labels.contains("app.name"));

    // Duplicate add is a no-op.
    let updated = manager.add_label(session.id.as_str(), "app.name".to_string()).await.expect("dup add");
    assert_eq!(updated.labels.iter().filter(|l| *l == "app.name").count(), 1);

    let err = manager.add_label(session.id.as_str(), "kubernetes.io/name".to_string()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument, "reserved prefix must be rejected");

    let too_long = "app.".to_string() + &"x".repeat(100);
    let err = manager.add_label(session.id.as_str(), too_long).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    let updated = manager.remove_label(session.id.as_str(), "app.name").await.expect("remove");
    assert!(!updated.labels.contains("app.name"));
}

#[tokio::test]
async fn get_all_labels_is_union_across_sessions() {
    let (manager, _quota) = manager(10).await;
    let s1 = manager.get_or_create("").await.expect("create 1");
    let s2 = manager.get_or_create("").await.expect("create 2");
    manager.add_label(s1.id.as_str(), "app.one".to_string()).await.expect("add");
    manager.add_label(s2.id.as_str(), "app.two".to_string()).await.expect("add");

    let all = manager.get_all_labels().await.expect("union");
    assert!(all.contains("app.one"));
    assert!(all.contains("app.two"));
}

#[tokio::test]
async fn list_summaries_is_cheap_metadata_view() {
    let (manager, _quota) = manager(10).await;
    manager.get_or_create("").await.expect("create");
    let summaries = manager.list_summaries().await.expect("list");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].stage, Stage::Init);
}
