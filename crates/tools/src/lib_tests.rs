// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;

fn test_quota() -> Arc<WorkspaceQuotaAccountant> {
    Arc::new(WorkspaceQuotaAccountant::new(1 << 30, 10 << 30))
}

#[test]
fn registers_all_nine_tools_without_collision() {
    let registry = ToolRegistry::new();
    register_all(&registry, test_quota()).unwrap();
    assert_eq!(registry.list().len(), 9);
    for name in [
        "analyze_repository",
        "generate_dockerfile",
        "generate_k8s_manifests",
        "build_image",
        "tag_image",
        "push_image",
        "pull_image",
        "scan_image",
        "deploy_k8s",
    ] {
        assert!(registry.lookup(name).is_some(), "missing tool {name}");
    }
}
