// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ck-tools: the concrete domain tools — repository
//! analysis, Dockerfile/manifest generation, image build/tag/push/pull,
//! vulnerability scanning, and Kubernetes deploy. Each is an opaque
//! callable from the orchestrator's point of view; the interesting
//! engineering lives in `ck-engine`, not here.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod analyze;
mod deploy;
mod dockerfile;
mod image;
mod manifests;
mod shell;

pub use analyze::AnalyzeRepositoryTool;
pub use deploy::DeployK8sTool;
pub use dockerfile::GenerateDockerfileTool;
pub use image::{BuildImageTool, PullImageTool, PushImageTool, ScanImageTool, TagImageTool};
pub use manifests::GenerateK8sManifestsTool;

use ck_core::WorkspaceQuotaAccountant;
use ck_engine::{RegistryError, ToolRegistry};
use std::sync::Arc;

/// Registers every built-in tool. Call once during bootstrap, before the
/// registry is frozen. `quota` is handed to the tools that write workspace
/// files so they can charge bytes to the accountant before the bytes touch
/// disk.
pub fn register_all(registry: &ToolRegistry, quota: Arc<WorkspaceQuotaAccountant>) -> Result<(), RegistryError> {
    registry.register(Arc::new(AnalyzeRepositoryTool))?;
    registry.register(Arc::new(GenerateDockerfileTool::new(quota.clone())))?;
    registry.register(Arc::new(GenerateK8sManifestsTool::new(quota)))?;
    registry.register(Arc::new(BuildImageTool))?;
    registry.register(Arc::new(TagImageTool))?;
    registry.register(Arc::new(PushImageTool))?;
    registry.register(Arc::new(PullImageTool))?;
    registry.register(Arc::new(ScanImageTool))?;
    registry.register(Arc::new(DeployK8sTool))?;
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
