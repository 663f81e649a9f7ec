// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `deploy_k8s`: applies a Deployment + Service pair to a cluster via
//! `kube-rs`, using `kube::Client::try_default()` and typed `Api<T>`
//! handles for cluster access.

use async_trait::async_trait;
use ck_core::{ErrorKind, TaggedError};
use ck_engine::{ExecutionContext, Tool, ToolArgs, ToolMetadata, ToolResult};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, PostParams};
use kube::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
struct DeployK8sArgs {
    session_id: String,
    app_name: String,
    image: String,
    #[serde(default = "default_namespace")]
    namespace: String,
    #[serde(default = "default_port")]
    container_port: i32,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_port() -> i32 {
    8080
}

pub struct DeployK8sTool;

#[async_trait]
impl Tool for DeployK8sTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("deploy_k8s", "Applies a Deployment and Service to a Kubernetes cluster", "1.0.0", "deploy")
    }

    async fn execute(&self, _ctx: &ExecutionContext, args: ToolArgs) -> ToolResult {
        let typed: DeployK8sArgs = ck_engine::ArgumentBinder::decode(args)?;

        let client = Client::try_default()
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Transient, format!("failed to create kube client: {e}")))?;

        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), typed.app_name.clone());

        let deployment = Deployment {
            metadata: ObjectMeta { name: Some(typed.app_name.clone()), labels: Some(labels.clone()), ..Default::default() },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector { match_labels: Some(labels.clone()), ..Default::default() },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta { labels: Some(labels.clone()), ..Default::default() }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: typed.app_name.clone(),
                            image: Some(typed.image.clone()),
                            ports: Some(vec![ContainerPort { container_port: typed.container_port, ..Default::default() }]),
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
            metadata: ObjectMeta {
                name: Some(format!("{}-svc", typed.app_name)),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                selector: Some(labels),
                ports: Some(vec![ServicePort { port: typed.container_port, target_port: None, ..Default::default() }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let deployments: Api<Deployment> = Api::namespaced(client.clone(), &typed.namespace);
        let services: Api<Service> = Api::namespaced(client, &typed.namespace);

        deployments
            .create(&PostParams::default(), &deployment)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Transient, format!("deployment apply failed: {e}")))?;
        services
            .create(&PostParams::default(), &service)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Transient, format!("service apply failed: {e}")))?;

        Ok(json!({
            "session_id": typed.session_id,
            "success": true,
            "namespace": typed.namespace,
            "deployment": typed.app_name,
            "service": format!("{}-svc", typed.app_name),
        }))
    }
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
