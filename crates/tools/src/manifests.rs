// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `generate_k8s_manifests`: builds a Deployment + Service pair as typed
//! `k8s-openapi` objects, then renders them to YAML the way `deploy_k8s`
//! would submit them — keeps the generator and the deployer speaking the
//! same schema instead of hand-templating YAML strings.

use async_trait::async_trait;
use ck_core::{ErrorKind, TaggedError, WorkspaceQuotaAccountant};
use ck_engine::{ExecutionContext, Tool, ToolArgs, ToolMetadata, ToolResult};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct GenerateManifestsArgs {
    session_id: String,
    app_name: String,
    image: String,
    #[serde(default = "default_port")]
    container_port: i32,
    workspace_dir: String,
}

fn default_port() -> i32 {
    8080
}

fn build_manifests(args: &GenerateManifestsArgs) -> (Deployment, Service) {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), args.app_name.clone());

    let deployment = Deployment {
        metadata: ObjectMeta { name: Some(args.app_name.clone()), labels: Some(labels.clone()), ..Default::default() },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector { match_labels: Some(labels.clone()), ..Default::default() },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta { labels: Some(labels.clone()), ..Default::default() }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: args.app_name.clone(),
                        image: Some(args.image.clone()),
                        ports: Some(vec![ContainerPort { container_port: args.container_port, ..Default::default() }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    let service = Service {
        metadata: ObjectMeta { name: Some(format!("{}-svc", args.app_name)), labels: Some(labels.clone()), ..Default::default() },
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(vec![ServicePort { port: args.container_port, target_port: None, ..Default::default() }]),
            ..Default::default()
        }),
        ..Default::default()
    };

    (deployment, service)
}

pub struct GenerateK8sManifestsTool {
    quota: Arc<WorkspaceQuotaAccountant>,
}

impl GenerateK8sManifestsTool {
    pub fn new(quota: Arc<WorkspaceQuotaAccountant>) -> Self {
        Self { quota }
    }
}

#[async_trait]
impl Tool for GenerateK8sManifestsTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(
            "generate_k8s_manifests",
            "Renders a Deployment and Service manifest for the built image",
            "1.0.0",
            "generation",
        )
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: GenerateManifestsArgs = ck_engine::ArgumentBinder::decode(args)?;
        let (deployment, service) = build_manifests(&typed);

        let deployment_yaml = serde_yaml::to_string(&deployment)
            .map_err(|e| TaggedError::new(ErrorKind::Internal, format!("cannot render deployment yaml: {e}")))?;
        let service_yaml = serde_yaml::to_string(&service)
            .map_err(|e| TaggedError::new(ErrorKind::Internal, format!("cannot render service yaml: {e}")))?;
        let combined = format!("{deployment_yaml}---\n{service_yaml}");

        let path = std::path::Path::new(&typed.workspace_dir).join("k8s-manifests.yaml");

        // Charge the quota before a single byte touches disk; roll back if
        // the write itself then fails.
        self.quota.add(&typed.session_id, combined.len() as i64)?;

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                let _ = self.quota.add(&typed.session_id, -(combined.len() as i64));
                return Err(TaggedError::new(ErrorKind::Internal, format!("cannot create {}: {e}", parent.display())));
            }
        }
        if let Err(e) = tokio::fs::write(&path, &combined).await {
            let _ = self.quota.add(&typed.session_id, -(combined.len() as i64));
            return Err(TaggedError::new(ErrorKind::Internal, format!("cannot write {}: {e}", path.display())));
        }

        Ok(json!({
            "session_id": typed.session_id,
            "success": true,
            "artifact_path": path.to_string_lossy(),
            "bytes_written": combined.len(),
        }))
    }
}

#[cfg(test)]
#[path = "manifests_tests.rs"]
mod tests;
