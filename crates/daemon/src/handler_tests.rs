use super::*;
use async_trait::async_trait;
use ck_core::{ErrorKind, FakeClock, WorkspaceQuotaAccountant};
use ck_engine::{BreakerRegistry, MiddlewareChain, Telemetry, Tool, ToolMetadata, ToolRegistry};
use ck_store::MemoryStore;
use ck_wire::{RequestId, CODE_METHOD_NOT_FOUND};
use serde_json::json;
use std::time::Duration;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("echo_tool", "echoes", "1.0.0", "test")
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ck_engine::ToolResult {
        Ok(Value::Object(args))
    }
}

struct AlwaysFailsTool;

#[async_trait]
impl Tool for AlwaysFailsTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("always_fails", "fails", "1.0.0", "test")
    }

    async fn execute(&self, _ctx: &ExecutionContext, _args: ToolArgs) -> ck_engine::ToolResult {
        Err(TaggedError::new(ErrorKind::InvalidArgument, "file /home/alice/.secret/key=abc123 is bad, token=shhh"))
    }
}

struct NoopAsyncExecutor;

#[async_trait]
impl crate::job::JobExecutor for NoopAsyncExecutor {
    async fn execute(
        &self,
        _job_id: &ck_core::JobId,
        _session_id: Option<&ck_core::SessionId>,
        input: Value,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> Result<Value, TaggedError> {
        Ok(input)
    }
}

async fn handler() -> RequestHandler<FakeClock> {
    let clock = FakeClock::new();
    let store: Arc<dyn ck_store::KvStore> = Arc::new(MemoryStore::new());
    let quota = Arc::new(WorkspaceQuotaAccountant::new(1 << 30, 10 << 30));
    let sessions =
        Arc::new(SessionManager::new(store.clone(), clock.clone(), quota, std::path::PathBuf::from("/tmp/ck-handler-test"), 10, Duration::from_secs(3600)).await.unwrap());

    let mut executors: std::collections::HashMap<String, Arc<dyn crate::job::JobExecutor>> = std::collections::HashMap::new();
    executors.insert("build_image".to_string(), Arc::new(NoopAsyncExecutor));
    let jobs = Arc::new(JobManager::new(store, clock.clone(), executors, 2, 16, Duration::from_secs(3600)));

    let registry = Arc::new(ToolRegistry::new());
    registry.register(Arc::new(EchoTool)).unwrap();
    registry.register(Arc::new(AlwaysFailsTool)).unwrap();
    let breakers = Arc::new(BreakerRegistry::new(clock.clone()));
    let (telemetry, _rx) = Telemetry::new(clock);
    let middleware = Arc::new(MiddlewareChain::new(Arc::new(telemetry)));
    let orchestrator = Arc::new(ToolOrchestrator::new(registry.clone(), breakers, middleware));

    RequestHandler::new(sessions, jobs, orchestrator, registry, std::path::PathBuf::from("/tmp/ck-handler-test"), None)
}

fn req(id: i64, method: &str, params: Option<Value>) -> Request {
    Request { id: Some(RequestId::Number(id)), method: method.to_string(), params }
}

#[tokio::test]
async fn initialize_round_trips() {
    let handler = handler().await;
    let response = handler
        .handle(req(
            1,
            METHOD_INITIALIZE,
            Some(json!({"protocolVersion": "2024-11-05", "clientInfo": {"name": "t", "version": "1"}})),
        ))
        .await
        .unwrap();
    assert!(response.error.is_none());
    assert_eq!(response.result.unwrap()["protocolVersion"], "2024-11-05");
}

#[tokio::test]
async fn initialized_notification_yields_no_response() {
    let handler = handler().await;
    let request = Request { id: None, method: METHOD_INITIALIZED.to_string(), params: None };
    assert!(handler.handle(request).await.is_none());
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let handler = handler().await;
    let response = handler.handle(req(2, "bogus/method", None)).await.unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.code, CODE_METHOD_NOT_FOUND);
}

#[tokio::test]
async fn tools_list_includes_registered_tools() {
    let handler = handler().await;
    let response = handler.handle(req(3, METHOD_TOOLS_LIST, None)).await.unwrap();
    let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
    assert_eq!(tools, 2);
}

#[tokio::test]
async fn tools_call_mints_session_when_absent() {
    let handler = handler().await;
    let response = handler
        .handle(req(4, METHOD_TOOLS_CALL, Some(json!({"name": "echo_tool", "arguments": {"session_id": ""}}))))
        .await
        .unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["success"], true);
    assert!(!result["session_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn tools_call_reuses_supplied_session() {
    let handler = handler().await;
    let first = handler
        .handle(req(5, METHOD_TOOLS_CALL, Some(json!({"name": "echo_tool", "arguments": {"session_id": ""}}))))
        .await
        .unwrap();
    let session_id = first.result.unwrap()["session_id"].as_str().unwrap().to_string();

    let second = handler
        .handle(req(6, METHOD_TOOLS_CALL, Some(json!({"name": "echo_tool", "arguments": {"session_id": session_id.clone()}}))))
        .await
        .unwrap();
    assert_eq!(second.result.unwrap()["session_id"], session_id);
}

#[tokio::test]
async fn long_running_tool_dispatches_as_job() {
    let handler = handler().await;
    let registry_clone = &handler.registry;
    registry_clone
        .register(Arc::new({
            struct BuildTool;
            #[async_trait]
            impl Tool for BuildTool {
                fn metadata(&self) -> ToolMetadata {
                    ToolMetadata::new("build_image", "builds", "1.0.0", "image")
                }
                async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ck_engine::ToolResult {
                    Ok(Value::Object(args))
                }
            }
            BuildTool
        }))
        .unwrap();

    let response = handler
        .handle(req(7, METHOD_TOOLS_CALL, Some(json!({"name": "build_image", "arguments": {"session_id": ""}}))))
        .await
        .unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["success"], true);
    assert!(result.get("job_id").is_some());
    assert!(result.get("result").is_none());
}

#[tokio::test]
async fn error_messages_are_sanitized() {
    let handler = handler().await;
    let response = handler
        .handle(req(8, METHOD_TOOLS_CALL, Some(json!({"name": "always_fails", "arguments": {"session_id": ""}}))))
        .await
        .unwrap();
    let error = response.error.unwrap();
    assert!(!error.message.contains("/home/alice"));
    assert!(!error.message.contains("abc123"));
    assert!(!error.message.contains("shhh"));
    assert_eq!(error.data.unwrap().kind, "invalid-argument");
}

#[tokio::test]
async fn unregistered_async_tool_is_not_found() {
    let handler = handler().await;
    let response = handler
        .handle(req(9, METHOD_TOOLS_CALL, Some(json!({"name": "push_image", "arguments": {"session_id": ""}}))))
        .await
        .unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.data.unwrap().kind, "not-found");
}
