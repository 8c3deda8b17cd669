use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{CheckError, CheckResult, HealthCheck};
use crate::cluster::ClusterClient;

const COMPONENT: &str = "API Server";

/// Verifies the API server answers a version request
pub struct ApiServerCheck {
    client: Arc<dyn ClusterClient>,
    timeout: Duration,
}

impl ApiServerCheck {
    pub fn new(client: Arc<dyn ClusterClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl HealthCheck for ApiServerCheck {
    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn check(&self) -> Result<CheckResult, CheckError> {
        let version = self
            .client
            .server_version()
            .await
            .context("Failed to connect to API server")?;

        Ok(CheckResult::healthy(COMPONENT, "API server is responding")
            .with_detail("version", version.git_version)
            .with_detail("platform", version.platform))
    }
}
