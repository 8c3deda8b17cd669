use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use crate::cluster::ClusterClient;
use crate::settings::Settings;
use crate::status::HealthStatus;

pub mod api_server;
pub mod nodes;
pub mod resources;
pub mod system_pods;
pub mod volumes;

use api_server::ApiServerCheck;
use nodes::NodeCheck;
use resources::ResourceUsageCheck;
use system_pods::SystemPodCheck;
use volumes::PersistentVolumeCheck;

/// Result of a single health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Subsystem that was checked, e.g. "Nodes"
    pub component: String,
    pub status: HealthStatus,
    /// Human-readable summary of the result
    pub message: String,
    /// Check specific metrics (counts, percentages, offending resources)
    pub details: BTreeMap<String, String>,
    /// When the check completed
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    pub fn new(
        component: impl Into<String>,
        status: HealthStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            status,
            message: message.into(),
            details: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn healthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Healthy, message)
    }

    pub fn warning(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Warning, message)
    }

    pub fn critical(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Critical, message)
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}

/// Why a check could not produce its own result
#[derive(Debug)]
pub enum CheckError {
    /// The probe could not complete (unreachable, API error, permission denied)
    Structural(anyhow::Error),
    /// An optional subsystem is unavailable, the cluster itself is not unhealthy
    Degraded(String),
}

impl Display for CheckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckError::Structural(e) => write!(f, "{:#}", e),
            CheckError::Degraded(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<anyhow::Error> for CheckError {
    fn from(e: anyhow::Error) -> Self {
        CheckError::Structural(e)
    }
}

/// Trait for cluster health checks
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Name of the checked subsystem, used as [CheckResult::component]
    fn component(&self) -> &'static str;

    /// Upper bound for a single run of [HealthCheck::check]
    fn timeout(&self) -> Duration;

    /// Severity reported when the probe itself fails
    fn failure_status(&self) -> HealthStatus {
        HealthStatus::Critical
    }

    /// Run the health check and return the result
    async fn check(&self) -> Result<CheckResult, CheckError>;
}

/// Run a single check, converting errors and timeouts into a [CheckResult]
pub async fn run_check(check: &dyn HealthCheck) -> CheckResult {
    let component = check.component();
    let timeout = check.timeout();

    let outcome = match tokio::time::timeout(timeout, check.check()).await {
        Ok(r) => r,
        Err(_) => Err(CheckError::Structural(anyhow::anyhow!(
            "{} check timed out after {}s",
            component,
            timeout.as_secs()
        ))),
    };

    match outcome {
        Ok(result) => {
            debug!("[{}] {}: {}", result.status, component, result.message);
            result
        }
        Err(CheckError::Degraded(msg)) => {
            warn!("[DEGRADED] {}: {}", component, msg);
            CheckResult::warning(component, msg)
        }
        Err(e @ CheckError::Structural(_)) => {
            let status = check.failure_status();
            warn!("[{}] {}: {}", status, component, e);
            CheckResult::new(component, status, e.to_string())
        }
    }
}

/// Runs an ordered list of checks, one result per check
pub struct CheckRunner {
    checks: Vec<Box<dyn HealthCheck>>,
}

impl CheckRunner {
    pub fn new(checks: Vec<Box<dyn HealthCheck>>) -> Self {
        Self { checks }
    }

    pub async fn run_all(&self) -> Vec<CheckResult> {
        info!("Running {} health checks", self.checks.len());
        let mut results = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            results.push(run_check(check.as_ref()).await);
        }
        results
    }
}

/// The standard set of cluster checks, in report order
pub fn default_checks(
    client: Arc<dyn ClusterClient>,
    settings: &Settings,
) -> Vec<Box<dyn HealthCheck>> {
    vec![
        Box::new(ApiServerCheck::new(client.clone(), settings.api_timeout())),
        Box::new(NodeCheck::new(client.clone(), settings.list_timeout())),
        Box::new(SystemPodCheck::new(
            client.clone(),
            settings.system_namespaces.clone(),
            settings.list_timeout(),
        )),
        Box::new(ResourceUsageCheck::new(
            client.clone(),
            settings.cpu_threshold,
            settings.memory_threshold,
            settings.list_timeout(),
        )),
        Box::new(PersistentVolumeCheck::new(client, settings.list_timeout())),
    ]
}
