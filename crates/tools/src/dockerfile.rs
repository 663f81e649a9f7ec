// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `generate_dockerfile`: renders a template keyed by language and writes
//! it into the session's workspace directory.

use async_trait::async_trait;
use ck_core::{ErrorKind, TaggedError, WorkspaceQuotaAccountant};
use ck_engine::{ExecutionContext, Tool, ToolArgs, ToolMetadata, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct GenerateDockerfileArgs {
    session_id: String,
    template: String,
    workspace_dir: String,
}

fn render(template: &str) -> Result<&'static str, TaggedError> {
    match template {
        "go" => Ok("FROM golang:1.22 AS build\nWORKDIR /src\nCOPY . .\nRUN go build -o /out/app ./...\n\nFROM gcr.io/distroless/base-debian12\nCOPY --from=build /out/app /app\nENTRYPOINT [\"/app\"]\n"),
        "rust" => Ok("FROM rust:1.80 AS build\nWORKDIR /src\nCOPY . .\nRUN cargo build --release\n\nFROM debian:bookworm-slim\nCOPY --from=build /src/target/release/app /app\nENTRYPOINT [\"/app\"]\n"),
        "node" => Ok("FROM node:20-slim AS build\nWORKDIR /src\nCOPY package*.json ./\nRUN npm ci\nCOPY . .\n\nFROM node:20-slim\nWORKDIR /app\nCOPY --from=build /src .\nCMD [\"node\", \"index.js\"]\n"),
        "python" => Ok("FROM python:3.12-slim\nWORKDIR /app\nCOPY requirements.txt .\nRUN pip install --no-cache-dir -r requirements.txt\nCOPY . .\nCMD [\"python\", \"main.py\"]\n"),
        "java" => Ok("FROM eclipse-temurin:21-jdk AS build\nWORKDIR /src\nCOPY . .\nRUN ./gradlew build\n\nFROM eclipse-temurin:21-jre\nCOPY --from=build /src/build/libs/*.jar /app.jar\nENTRYPOINT [\"java\", \"-jar\", \"/app.jar\"]\n"),
        other => Err(TaggedError::new(ErrorKind::InvalidArgument, format!("no Dockerfile template for {other}"))),
    }
}

pub struct GenerateDockerfileTool {
    quota: Arc<WorkspaceQuotaAccountant>,
}

impl GenerateDockerfileTool {
    pub fn new(quota: Arc<WorkspaceQuotaAccountant>) -> Self {
        Self { quota }
    }
}

#[async_trait]
impl Tool for GenerateDockerfileTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("generate_dockerfile", "Renders a Dockerfile for the detected language", "1.0.0", "generation")
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: GenerateDockerfileArgs = ck_engine::ArgumentBinder::decode(args)?;
        let contents = render(&typed.template)?;
        let path = std::path::Path::new(&typed.workspace_dir).join("Dockerfile");

        // Charge the quota before a single byte touches disk; roll back if
        // the write itself then fails.
        self.quota.add(&typed.session_id, contents.len() as i64)?;

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                let _ = self.quota.add(&typed.session_id, -(contents.len() as i64));
                return Err(TaggedError::new(ErrorKind::Internal, format!("cannot create {}: {e}", parent.display())));
            }
        }
        if let Err(e) = tokio::fs::write(&path, contents).await {
            let _ = self.quota.add(&typed.session_id, -(contents.len() as i64));
            return Err(TaggedError::new(ErrorKind::Internal, format!("cannot write {}: {e}", path.display())));
        }

        Ok(json!({
            "session_id": typed.session_id,
            "success": true,
            "artifact_path": path.to_string_lossy(),
            "bytes_written": contents.len(),
        }))
    }
}

#[cfg(test)]
#[path = "dockerfile_tests.rs"]
mod tests;
