// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request Handler: binds a decoded wire [`Request`] to the
//! orchestrator, minting or resolving a session first and serializing the
//! tool's result back through the wire. Tools whose executor shells out to
//! a slow external binary (`docker build`, `docker push/pull`, a scanner,
//! `kubectl apply`) are dispatched through the Job Manager instead of
//! inline, so the caller gets a job id back immediately.

use crate::job::JobManager;
use crate::session::SessionManager;
use crate::transport::Handler;
use async_trait::async_trait;
use ck_core::{Clock, ErrorKind, SystemClock, TaggedError};
use ck_engine::{ExecutionContext, ToolArgs, ToolOrchestrator, ToolRegistry};
use ck_wire::{
    validate_descriptor, ErrorData, InitializeParams, Request, Response, ResponseError, ToolDescriptor,
    ToolsCallParams, CODE_APPLICATION_ERROR, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST,
};
use regex::Regex;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Tool names whose executor is expected to run long enough (network
/// pulls/pushes, a full image build, a vulnerability scan, a cluster
/// apply) that the caller shouldn't block on it inline. Kept as a literal
/// allow-list rather than tool metadata because the decision belongs to
/// the server's dispatch policy, not to the tool itself.
const ASYNC_TOOL_KINDS: &[&str] = &["build_image", "push_image", "pull_image", "scan_image", "deploy_k8s"];

fn is_async_tool(name: &str) -> bool {
    ASYNC_TOOL_KINDS.contains(&name)
}

pub struct RequestHandler<C: Clock = SystemClock> {
    sessions: Arc<SessionManager<C>>,
    jobs: Arc<JobManager<C>>,
    orchestrator: Arc<ToolOrchestrator<C>>,
    registry: Arc<ToolRegistry>,
    workspace_root: std::path::PathBuf,
    api_key: Option<String>,
}

impl<C: Clock> RequestHandler<C> {
    pub fn new(
        sessions: Arc<SessionManager<C>>,
        jobs: Arc<JobManager<C>>,
        orchestrator: Arc<ToolOrchestrator<C>>,
        registry: Arc<ToolRegistry>,
        workspace_root: std::path::PathBuf,
        api_key: Option<String>,
    ) -> Self {
        Self { sessions, jobs, orchestrator, registry, workspace_root, api_key }
    }

    /// Validates a caller-supplied API key against the configured one, if
    /// any. The stdio
    /// transport this workspace ships has no header channel to carry it;
    /// this hook exists for an HTTP transport to call before dispatching.
    pub fn check_api_key(&self, provided: Option<&str>) -> Result<(), TaggedError> {
        match (&self.api_key, provided) {
            (None, _) => Ok(()),
            (Some(expected), Some(got)) if expected == got => Ok(()),
            _ => Err(TaggedError::new(ErrorKind::InvalidArgument, "missing or incorrect api key")),
        }
    }

    async fn handle_initialize(&self, request: &Request, params: Option<Value>) -> Response {
        let id = request.id.clone().expect("non-notification request always carries an id");
        if let Some(params) = params {
            if serde_json::from_value::<InitializeParams>(params).is_err() {
                return Response::err(id, ResponseError::invalid_params("malformed initialize params"));
            }
        }
        Response::ok(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": { "name": "container-kit-server", "version": env!("CARGO_PKG_VERSION") },
                "capabilities": { "tools": {} },
            }),
        )
    }

    fn handle_tools_list(&self, request: &Request) -> Response {
        let id = request.id.clone().expect("non-notification request always carries an id");
        let mut descriptors = Vec::new();
        for metadata in self.registry.list() {
            let Some(tool) = self.registry.lookup(&metadata.name) else { continue };
            let descriptor = ToolDescriptor {
                name: metadata.name.clone(),
                description: metadata.description.clone(),
                input_schema: tool.input_schema(),
            };
            if let Err(e) = validate_descriptor(&descriptor) {
                // A schema regression here is a bootstrap-time bug, not a
                // caller error; drop the offending tool rather than shipping
                // a non-conformant schema.
                warn!(tool = %descriptor.name, error = %e, "dropping tool with non-conformant schema from tools/list");
                continue;
            }
            descriptors.push(descriptor);
        }
        Response::ok(id, json!({ "tools": descriptors }))
    }

    async fn resolve_session(&self, args: &ToolArgs) -> Result<(String, String), TaggedError> {
        let requested = args.get("session_id").and_then(Value::as_str).unwrap_or("");
        let session = self.sessions.get_or_create(requested).await?;
        Ok((session.id.to_string(), session.workspace_dir.to_string_lossy().into_owned()))
    }

    async fn handle_tools_call(&self, request: &Request, params: Option<Value>) -> Response {
        let id = request.id.clone().expect("non-notification request always carries an id");
        let Some(params) = params else {
            return Response::err(id, ResponseError::invalid_params("tools/call requires params"));
        };
        let call: ToolsCallParams = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => return Response::err(id, ResponseError::invalid_params(format!("malformed tools/call params: {e}"))),
        };

        let mut args = call.arguments;
        let (session_id, workspace_dir) = match self.resolve_session(&args).await {
            Ok(resolved) => resolved,
            Err(e) => return Response::err(id, self.error_response(&e)),
        };
        args.insert("session_id".to_string(), Value::String(session_id.clone()));
        args.entry("workspace_dir".to_string()).or_insert_with(|| Value::String(workspace_dir.clone()));

        if is_async_tool(&call.name) {
            if self.registry.lookup(&call.name).is_none() {
                let e = TaggedError::not_found(format!("tool {} not found", call.name)).with_tool(call.name.clone());
                return Response::err(id, self.error_response(&e));
            }
            let session = ck_core::SessionId::from_string(&session_id);
            match self.jobs.create(call.name.clone(), Some(session), Value::Object(args)).await {
                Ok(job_id) => Response::ok(
                    id,
                    json!({
                        "success": true,
                        "session_id": session_id,
                        "job_id": job_id.to_string(),
                        "stats": { "total_sessions": self.sessions.session_count() },
                    }),
                ),
                Err(e) => Response::err(id, self.error_response(&e)),
            }
        } else {
            let ctx = ExecutionContext::new("", call.name.clone()).with_session(session_id.clone());
            match self.orchestrator.execute(ctx, &call.name, args).await {
                Ok(result) => Response::ok(
                    id,
                    json!({
                        "success": true,
                        "session_id": session_id,
                        "result": result,
                        "stats": { "total_sessions": self.sessions.session_count() },
                    }),
                ),
                Err(e) => Response::err(id, self.error_response(&e)),
            }
        }
    }

    fn error_response(&self, error: &TaggedError) -> ResponseError {
        let message = sanitize_message(&error.message, &self.workspace_root);
        let correlation_id = error.correlation_id.clone().unwrap_or_default();
        ResponseError {
            code: CODE_APPLICATION_ERROR,
            message,
            data: Some(ErrorData { kind: error.kind.as_str().to_string(), correlation_id }),
        }
    }
}

#[async_trait]
impl<C: Clock> Handler for RequestHandler<C> {
    async fn handle(&self, request: Request) -> Option<Response> {
        let is_notification = request.is_notification();
        let method = request.method.clone();
        let params = request.params.clone();

        let response = match method.as_str() {
            METHOD_INITIALIZED => None, // notification, acknowledged silently
            METHOD_INITIALIZE => Some(self.handle_initialize(&request, params).await),
            METHOD_TOOLS_LIST if !is_notification => Some(self.handle_tools_list(&request)),
            METHOD_TOOLS_CALL if !is_notification => Some(self.handle_tools_call(&request, params).await),
            _ if is_notification => None, // unknown notifications are ignored, not errors
            _ => {
                let id = request.id.clone()?;
                Some(Response::err(id, ResponseError::method_not_found(&method)))
            }
        };
        response
    }
}

/// Sanitize an error message before it reaches the wire:
/// collapse absolute paths under the workspace root to a relative form,
/// redact any other absolute filesystem path entirely, and redact strings
/// that look like credentials (`key=value`-shaped secrets, bearer tokens).
fn sanitize_message(message: &str, workspace_root: &Path) -> String {
    let mut sanitized = message.to_string();

    // Redact key=value / key: value shaped secrets before path truncation
    // runs, since a credential can itself appear inside a path segment.
    if let Ok(secret_re) = Regex::new(r"(?i)(\b[\w-]*(?:key|token|secret|password)[\w-]*)\s*[:=]\s*[^\s,;]+") {
        sanitized = secret_re.replace_all(&sanitized, "$1=<redacted>").into_owned();
    }
    if let Ok(bearer_re) = Regex::new(r"(?i)\bBearer\s+\S+") {
        sanitized = bearer_re.replace_all(&sanitized, "Bearer <redacted>").into_owned();
    }

    if let Some(root) = workspace_root.to_str() {
        if !root.is_empty() {
            sanitized = sanitized.replace(root, "<workspace>");
        }
    }
    // Any remaining absolute path of 3+ segments is outside the workspace
    // root (already collapsed above) and gets dropped wholesale.
    if let Ok(path_re) = Regex::new(r"(?:/[\w.\-]+){3,}") {
        sanitized = path_re.replace_all(&sanitized, "<path>").into_owned();
    }

    sanitized
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
