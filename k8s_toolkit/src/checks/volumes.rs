use anyhow::Context;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;

use super::{CheckError, CheckResult, HealthCheck};
use crate::cluster::ClusterClient;
use crate::status::HealthStatus;

const COMPONENT: &str = "Persistent Volumes";

/// Verifies no persistent volume is in the `Failed` phase
pub struct PersistentVolumeCheck {
    client: Arc<dyn ClusterClient>,
    timeout: Duration,
}

impl PersistentVolumeCheck {
    pub fn new(client: Arc<dyn ClusterClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl HealthCheck for PersistentVolumeCheck {
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
        let pvs = self
            .client
            .list_persistent_volumes()
            .await
            .context("Failed to list PVs")?;

        let mut available = 0;
        let mut bound = 0;
        let mut failed = Vec::new();
        for pv in &pvs {
            match pv.status.as_ref().and_then(|s| s.phase.as_deref()) {
                Some("Available") => available += 1,
                Some("Bound") => bound += 1,
                Some("Failed") => failed.push(pv.name_any()),
                _ => {}
            }
        }

        let result = if failed.is_empty() {
            CheckResult::healthy(COMPONENT, format!("All {} PVs are healthy", pvs.len()))
        } else {
            CheckResult::warning(COMPONENT, format!("{} PVs in failed state", failed.len()))
                .with_detail("failed_pv_names", failed.join(", "))
        };

        Ok(result
            .with_detail("total_pvs", pvs.len())
            .with_detail("available_pvs", available)
            .with_detail("bound_pvs", bound)
            .with_detail("failed_pvs", failed.len()))
    }
}
