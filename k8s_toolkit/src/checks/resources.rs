use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{CheckError, CheckResult, HealthCheck};
use crate::cluster::{ClusterClient, NodeMetrics};
use crate::quantity::{cpu_millis, memory_bytes};
use crate::status::HealthStatus;

const COMPONENT: &str = "Resource Usage";

/// Flags nodes whose CPU or memory usage is above a threshold
pub struct ResourceUsageCheck {
    client: Arc<dyn ClusterClient>,
    cpu_threshold: f64,
    memory_threshold: f64,
    timeout: Duration,
}

/// Usage of one node as a percent of its capacity
#[derive(Debug, Clone, PartialEq)]
struct NodeUtilization {
    name: String,
    cpu_percent: f64,
    memory_percent: f64,
}

fn utilization(metrics: &NodeMetrics, node: &Node) -> Result<Option<NodeUtilization>> {
    let capacity = match node.status.as_ref().and_then(|s| s.capacity.as_ref()) {
        Some(c) => c,
        None => return Ok(None),
    };
    let (Some(cpu_cap), Some(mem_cap), Some(cpu_used), Some(mem_used)) = (
        capacity.get("cpu"),
        capacity.get("memory"),
        metrics.usage.get("cpu"),
        metrics.usage.get("memory"),
    ) else {
        return Ok(None);
    };

    let cpu_cap = cpu_millis(cpu_cap)?;
    let mem_cap = memory_bytes(mem_cap)?;
    if cpu_cap <= 0.0 || mem_cap <= 0.0 {
        return Ok(None);
    }

    Ok(Some(NodeUtilization {
        name: metrics.name.clone(),
        cpu_percent: cpu_millis(cpu_used)? * 100.0 / cpu_cap,
        memory_percent: memory_bytes(mem_used)? * 100.0 / mem_cap,
    }))
}

impl ResourceUsageCheck {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        cpu_threshold: f64,
        memory_threshold: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            cpu_threshold,
            memory_threshold,
            timeout,
        }
    }
}

#[async_trait]
impl HealthCheck for ResourceUsageCheck {
    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn failure_status(&self) -> HealthStatus {
        HealthStatus::Warning
    }

    async fn check(&self) -> Result<CheckResult, CheckError> {
        let metrics = match self.client.list_node_metrics().await {
            Ok(Some(m)) => m,
            Ok(None) => {
                return Err(CheckError::Degraded(
                    "Metrics server not available".to_string(),
                ));
            }
            Err(e) => {
                return Err(CheckError::Degraded(format!(
                    "Failed to get node metrics: {:#}",
                    e
                )));
            }
        };

        if metrics.is_empty() {
            return Err(CheckError::Degraded(
                "No node metrics available".to_string(),
            ));
        }

        let nodes: HashMap<String, Node> = self
            .client
            .list_nodes()
            .await
            .map_err(|e| CheckError::Structural(e.context("Failed to get node capacity")))?
            .into_iter()
            .map(|n| (n.name_any(), n))
            .collect();

        let mut high_cpu = Vec::new();
        let mut high_memory = Vec::new();
        let mut checked = 0usize;
        let mut skipped = 0usize;
        for sample in &metrics {
            let Some(node) = nodes.get(&sample.name) else {
                warn!("No node object for metrics of {}, skipping", sample.name);
                skipped += 1;
                continue;
            };
            let usage = match utilization(sample, node) {
                Ok(Some(u)) => u,
                Ok(None) => {
                    warn!("Incomplete capacity or usage for {}, skipping", sample.name);
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Invalid quantity for {}: {:#}", sample.name, e);
                    skipped += 1;
                    continue;
                }
            };
            checked += 1;

            if usage.cpu_percent > self.cpu_threshold {
                high_cpu.push(format!("{}({:.1}%)", usage.name, usage.cpu_percent));
            }
            if usage.memory_percent > self.memory_threshold {
                high_memory.push(format!("{}({:.1}%)", usage.name, usage.memory_percent));
            }
        }

        if checked == 0 {
            return Err(CheckError::Degraded(format!(
                "No usable node metrics ({} samples skipped)",
                skipped
            )));
        }

        let result = if high_cpu.is_empty() && high_memory.is_empty() {
            CheckResult::healthy(COMPONENT, "Resource usage is within normal limits")
        } else {
            let mut issues = Vec::new();
            if !high_cpu.is_empty() {
                issues.push(format!("High CPU: {}", high_cpu.join(", ")));
            }
            if !high_memory.is_empty() {
                issues.push(format!("High Memory: {}", high_memory.join(", ")));
            }
            CheckResult::warning(COMPONENT, issues.join("; "))
        };

        let result = result.with_detail("nodes_checked", checked);
        if skipped > 0 {
            return Ok(result.with_detail("nodes_skipped", skipped));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::run_check;
    use crate::mocks::{MockCluster, MockMetrics};

    fn check_for(cluster: MockCluster) -> ResourceUsageCheck {
        check_with_threshold(cluster, 80.0)
    }

    fn check_with_threshold(cluster: MockCluster, threshold: f64) -> ResourceUsageCheck {
        ResourceUsageCheck::new(
            Arc::new(cluster),
            threshold,
            threshold,
            Duration::from_secs(30),
        )
    }

    fn nodes() -> Option<Vec<Node>> {
        Some(vec![
            MockCluster::mock_node("node-1", Some(("True", "ok"))),
            MockCluster::mock_node("node-2", Some(("True", "ok"))),
        ])
    }

    #[tokio::test]
    async fn metrics_api_missing_is_warning() {
        let cluster = MockCluster {
            metrics: MockMetrics::Unavailable,
            ..Default::default()
        };
        let result = run_check(&check_for(cluster)).await;
        assert_eq!(result.status, HealthStatus::Warning);
        assert_eq!(result.message, "Metrics server not available");
    }

    #[tokio::test]
    async fn metrics_error_is_warning() {
        let cluster = MockCluster {
            metrics: MockMetrics::Failing,
            ..Default::default()
        };
        let result = run_check(&check_for(cluster)).await;
        assert_eq!(result.status, HealthStatus::Warning);
        assert!(result.message.starts_with("Failed to get node metrics: "));
    }

    #[tokio::test]
    async fn no_samples_is_warning() {
        let result = run_check(&check_for(MockCluster::default())).await;
        assert_eq!(result.status, HealthStatus::Warning);
        assert_eq!(result.message, "No node metrics available");
    }

    #[tokio::test]
    async fn usage_within_limits() {
        // capacity is 4 cpu / 16Gi per mock node
        let cluster = MockCluster {
            nodes: nodes(),
            metrics: MockMetrics::Samples(vec![
                MockCluster::mock_node_metrics("node-1", "1200m", "8Gi"),
                MockCluster::mock_node_metrics("node-2", "3200m", "12Gi"),
            ]),
            ..Default::default()
        };
        let result = run_check(&check_for(cluster)).await;
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.message, "Resource usage is within normal limits");
        assert_eq!(result.details["nodes_checked"], "2");
    }

    #[tokio::test]
    async fn high_usage_is_listed_per_dimension() {
        let cluster = MockCluster {
            nodes: nodes(),
            metrics: MockMetrics::Samples(vec![
                MockCluster::mock_node_metrics("node-1", "3600m", "8Gi"),
                MockCluster::mock_node_metrics("node-2", "3500m", "14Gi"),
            ]),
            ..Default::default()
        };
        let result = run_check(&check_for(cluster)).await;
        assert_eq!(result.status, HealthStatus::Warning);
        assert_eq!(
            result.message,
            "High CPU: node-1(90.0%), node-2(87.5%); High Memory: node-2(87.5%)"
        );
    }

    #[tokio::test]
    async fn unknown_nodes_are_skipped() {
        let cluster = MockCluster {
            nodes: nodes(),
            metrics: MockMetrics::Samples(vec![
                MockCluster::mock_node_metrics("node-1", "100m", "1Gi"),
                MockCluster::mock_node_metrics("gone-node", "4", "16Gi"),
            ]),
            ..Default::default()
        };
        let result = run_check(&check_for(cluster)).await;
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.details["nodes_checked"], "1");
        assert_eq!(result.details["nodes_skipped"], "1");
    }

    #[tokio::test]
    async fn nothing_measured_is_warning() {
        let cluster = MockCluster {
            nodes: nodes(),
            metrics: MockMetrics::Samples(vec![
                MockCluster::mock_node_metrics("gone-node", "4", "16Gi"),
                MockCluster::mock_node_metrics("node-1", "lots", "1Gi"),
            ]),
            ..Default::default()
        };
        let result = run_check(&check_for(cluster)).await;
        assert_eq!(result.status, HealthStatus::Warning);
        assert_eq!(result.message, "No usable node metrics (2 samples skipped)");
    }

    #[tokio::test]
    async fn exactly_at_threshold_is_not_high() {
        // 3000m of 4 cpu and 12Gi of 16Gi are both exactly 75%
        let cluster = MockCluster {
            nodes: nodes(),
            metrics: MockMetrics::Samples(vec![MockCluster::mock_node_metrics(
                "node-1", "3000m", "12Gi",
            )]),
            ..Default::default()
        };
        let result = run_check(&check_with_threshold(cluster, 75.0)).await;
        assert_eq!(result.status, HealthStatus::Healthy, "{}", result.message);
        assert_eq!(result.details["nodes_checked"], "1");
        assert!(!result.details.contains_key("nodes_skipped"));
    }

    #[tokio::test]
    async fn just_above_threshold_is_high() {
        let cluster = MockCluster {
            nodes: nodes(),
            metrics: MockMetrics::Samples(vec![MockCluster::mock_node_metrics(
                "node-1", "3040m", "12.5Gi",
            )]),
            ..Default::default()
        };
        let result = run_check(&check_with_threshold(cluster, 75.0)).await;
        assert_eq!(result.status, HealthStatus::Warning);
        assert_eq!(
            result.message,
            "High CPU: node-1(76.0%); High Memory: node-1(78.1%)"
        );
    }
}
