use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;

use super::{CheckError, CheckResult, HealthCheck};
use crate::cluster::ClusterClient;

const COMPONENT: &str = "Nodes";

/// Verifies every node reports `Ready=True`
pub struct NodeCheck {
    client: Arc<dyn ClusterClient>,
    timeout: Duration,
}

impl NodeCheck {
    pub fn new(client: Arc<dyn ClusterClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

/// Readiness of a node, `Err` holds the reason it is not ready
fn node_readiness(node: &Node) -> Result<(), String> {
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|c| c.iter().find(|c| c.type_ == "Ready"));

    match ready {
        Some(c) if c.status == "True" => Ok(()),
        Some(c) => Err(c.message.clone().unwrap_or_else(|| format!("Ready={}", c.status))),
        None => Err("Ready condition not found".to_string()),
    }
}

#[async_trait]
impl HealthCheck for NodeCheck {
    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn check(&self) -> Result<CheckResult, CheckError> {
        let nodes = self
            .client
            .list_nodes()
            .await
            .context("Failed to list nodes")?;

        if nodes.is_empty() {
            return Ok(CheckResult::critical(COMPONENT, "No nodes found in cluster"));
        }

        let mut ready_nodes = 0;
        let mut issues = Vec::new();
        for node in &nodes {
            match node_readiness(node) {
                Ok(()) => ready_nodes += 1,
                Err(reason) => issues.push(format!("{}: {}", node.name_any(), reason)),
            }
        }
        let not_ready_nodes = issues.len();

        let result = if not_ready_nodes > 0 {
            CheckResult::warning(COMPONENT, format!("{} nodes not ready", not_ready_nodes))
                .with_detail("issues", issues.join("; "))
        } else {
            CheckResult::healthy(COMPONENT, format!("All {} nodes are ready", ready_nodes))
        };

        Ok(result
            .with_detail("total_nodes", nodes.len())
            .with_detail("ready_nodes", ready_nodes)
            .with_detail("not_ready_nodes", not_ready_nodes))
    }
}
