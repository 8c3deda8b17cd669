use async_trait::async_trait;
use kube::ResourceExt;
use log::warn;
use std::sync::Arc;
use std::time::Duration;

use super::{CheckError, CheckResult, HealthCheck};
use crate::cluster::ClusterClient;
use crate::status::HealthStatus;

const COMPONENT: &str = "System Pods";

/// Verifies pods in the system namespaces are running or completed
pub struct SystemPodCheck {
    client: Arc<dyn ClusterClient>,
    namespaces: Vec<String>,
    timeout: Duration,
}

impl SystemPodCheck {
    pub fn new(client: Arc<dyn ClusterClient>, namespaces: Vec<String>, timeout: Duration) -> Self {
        Self {
            client,
            namespaces,
            timeout,
        }
    }
}

#[async_trait]
impl HealthCheck for SystemPodCheck {
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
        let mut issues = Vec::new();
        let mut total_pods = 0;
        let mut running_pods = 0;

        for ns in &self.namespaces {
            let pods = match self.client.list_pods(ns).await {
                Ok(pods) => pods,
                Err(e) => {
                    warn!("Failed to list pods in {}: {:#}", ns, e);
                    issues.push(format!("Failed to list pods in {}: {:#}", ns, e));
                    continue;
                }
            };

            for pod in &pods {
                total_pods += 1;
                let phase = pod
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.as_deref())
                    .unwrap_or("Unknown");
                match phase {
                    "Running" => running_pods += 1,
                    "Succeeded" => {}
                    _ => issues.push(format!("{}/{}: {}", ns, pod.name_any(), phase)),
                }
            }
        }

        let result = if issues.is_empty() {
            CheckResult::healthy(
                COMPONENT,
                format!("All {} system pods are running", running_pods),
            )
        } else {
            CheckResult::warning(COMPONENT, format!("{} system pods have issues", issues.len()))
                .with_detail("issues", issues.join("; "))
        };

        Ok(result
            .with_detail("total_system_pods", total_pods)
            .with_detail("running_pods", running_pods))
    }
}
