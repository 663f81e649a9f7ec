// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Image lifecycle tools: build/tag/push/pull shell out to the `docker`
//! CLI rather than linking a client library; `scan_image` shells out to
//! `trivy`.

use crate::shell;
use async_trait::async_trait;
use ck_engine::{ExecutionContext, Tool, ToolArgs, ToolMetadata, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize)]
struct BuildImageArgs {
    session_id: String,
    context_dir: String,
    tag: String,
    #[serde(default)]
    dockerfile: Option<String>,
}

pub struct BuildImageTool;

#[async_trait]
impl Tool for BuildImageTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("build_image", "Builds a container image with docker build", "1.0.0", "image")
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: BuildImageArgs = ck_engine::ArgumentBinder::decode(args)?;
        let cmd_args = build_args(&typed);
        let arg_refs: Vec<&str> = cmd_args.iter().map(String::as_str).collect();

        let output = shell::run("docker", &arg_refs).await?;
        Ok(json!({"session_id": typed.session_id, "success": true, "tag": typed.tag, "log": output.stdout}))
    }
}

fn build_args(args: &BuildImageArgs) -> Vec<String> {
    let mut cmd_args = vec!["build".to_string(), "-t".to_string(), args.tag.clone()];
    if let Some(dockerfile) = &args.dockerfile {
        cmd_args.push("-f".to_string());
        cmd_args.push(dockerfile.clone());
    }
    cmd_args.push(args.context_dir.clone());
    cmd_args
}

#[derive(Debug, Serialize, Deserialize)]
struct TagImageArgs {
    session_id: String,
    source_tag: String,
    target_tag: String,
}

pub struct TagImageTool;

#[async_trait]
impl Tool for TagImageTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("tag_image", "Applies an additional tag to a built image", "1.0.0", "image")
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: TagImageArgs = ck_engine::ArgumentBinder::decode(args)?;
        shell::run("docker", &["tag", &typed.source_tag, &typed.target_tag]).await?;
        Ok(json!({"session_id": typed.session_id, "success": true, "tag": typed.target_tag}))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PushImageArgs {
    session_id: String,
    tag: String,
}

pub struct PushImageTool;

#[async_trait]
impl Tool for PushImageTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("push_image", "Pushes an image to its registry", "1.0.0", "image")
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: PushImageArgs = ck_engine::ArgumentBinder::decode(args)?;
        let output = shell::run("docker", &["push", &typed.tag]).await?;
        Ok(json!({"session_id": typed.session_id, "success": true, "tag": typed.tag, "log": output.stdout}))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PullImageArgs {
    session_id: String,
    tag: String,
}

pub struct PullImageTool;

#[async_trait]
impl Tool for PullImageTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("pull_image", "Pulls an image from its registry", "1.0.0", "image")
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: PullImageArgs = ck_engine::ArgumentBinder::decode(args)?;
        let output = shell::run("docker", &["pull", &typed.tag]).await?;
        Ok(json!({"session_id": typed.session_id, "success": true, "tag": typed.tag, "log": output.stdout}))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ScanImageArgs {
    session_id: String,
    tag: String,
}

pub struct ScanImageTool;

#[async_trait]
impl Tool for ScanImageTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("scan_image", "Scans an image for known vulnerabilities with trivy", "1.0.0", "security")
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: ScanImageArgs = ck_engine::ArgumentBinder::decode(args)?;
        let output = shell::run("trivy", &["image", "--format", "json", "--quiet", &typed.tag]).await?;
        let findings: serde_json::Value = serde_json::from_str(&output.stdout).unwrap_or(json!({"raw": output.stdout}));
        Ok(json!({"session_id": typed.session_id, "success": true, "tag": typed.tag, "findings": findings}))
    }
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
