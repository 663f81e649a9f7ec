// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `analyze_repository`: sniffs a checked-out repository for its
//! dependency manifest and reports a detected language + file count so
//! downstream tools (Dockerfile/manifest generation) can pick a template.

use async_trait::async_trait;
use ck_core::{ErrorKind, TaggedError};
use ck_engine::{ExecutionContext, Tool, ToolArgs, ToolMetadata, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

const LANGUAGE_MARKERS: &[(&str, &str)] = &[
    ("Cargo.toml", "rust"),
    ("package.json", "node"),
    ("go.mod", "go"),
    ("pyproject.toml", "python"),
    ("requirements.txt", "python"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
];

#[derive(Debug, Serialize, Deserialize)]
struct AnalyzeArgs {
    session_id: String,
    repo_path: String,
}

#[derive(Debug, Serialize)]
struct RepositoryAnalysis {
    language: Option<String>,
    dependency_manifest: Option<String>,
    has_dockerfile: bool,
    file_count: usize,
}

async fn detect(repo_path: &Path) -> Result<RepositoryAnalysis, TaggedError> {
    let mut entries = tokio::fs::read_dir(repo_path)
        .await
        .map_err(|e| TaggedError::new(ErrorKind::InvalidArgument, format!("cannot read {}: {e}", repo_path.display())))?;

    let mut language = None;
    let mut dependency_manifest = None;
    let mut has_dockerfile = false;
    let mut file_count = 0usize;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TaggedError::new(ErrorKind::Internal, format!("directory walk failed: {e}")))?
    {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        file_count += 1;

        if name == "Dockerfile" {
            has_dockerfile = true;
        }
        for (marker, lang) in LANGUAGE_MARKERS {
            if name == *marker {
                language = Some((*lang).to_string());
                dependency_manifest = Some(marker.to_string());
            }
        }
    }

    Ok(RepositoryAnalysis { language, dependency_manifest, has_dockerfile, file_count })
}

pub struct AnalyzeRepositoryTool;

#[async_trait]
impl Tool for AnalyzeRepositoryTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(
            "analyze_repository",
            "Detects the dominant language and build manifest of a checked-out repository",
            "1.0.0",
            "analysis",
        )
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: AnalyzeArgs = ck_engine::ArgumentBinder::decode(args)?;
        let analysis = detect(Path::new(&typed.repo_path)).await?;
        Ok(json!({
            "session_id": typed.session_id,
            "success": true,
            "language": analysis.language,
            "dependency_manifest": analysis.dependency_manifest,
            "has_dockerfile": analysis.has_dockerfile,
            "file_count": analysis.file_count,
        }))
    }
}

#[cfg(test)]
#[path = "analyze_tests.rs"]
mod tests;
