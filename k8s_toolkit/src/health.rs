use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::checks::{CheckResult, CheckRunner};
use crate::status::HealthStatus;

/// Aggregated result of one health check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub overall_status: HealthStatus,
    pub checks: Vec<CheckResult>,
    /// Number of checks per status, every status is always present
    pub summary: BTreeMap<HealthStatus, usize>,
    pub timestamp: DateTime<Utc>,
}

/// Most severe status of all checks, [HealthStatus::Healthy] when there are none
pub fn overall_status(checks: &[CheckResult]) -> HealthStatus {
    checks
        .iter()
        .map(|c| c.status)
        .max_by_key(|s| s.rank())
        .unwrap_or(HealthStatus::Healthy)
}

impl ClusterHealth {
    pub fn aggregate(checks: Vec<CheckResult>) -> Self {
        let mut summary: BTreeMap<HealthStatus, usize> =
            HealthStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for check in &checks {
            *summary.entry(check.status).or_default() += 1;
        }

        Self {
            overall_status: overall_status(&checks),
            checks,
            summary,
            timestamp: Utc::now(),
        }
    }

    /// Process exit code, non-zero only for a critical cluster
    pub fn exit_code(&self) -> i32 {
        match self.overall_status {
            HealthStatus::Critical => 1,
            HealthStatus::Healthy | HealthStatus::Warning => 0,
        }
    }
}

/// Runs the checks and aggregates their results
pub struct HealthChecker {
    runner: CheckRunner,
}

impl HealthChecker {
    pub fn new(runner: CheckRunner) -> Self {
        Self { runner }
    }

    pub async fn run(&self) -> ClusterHealth {
        let health = ClusterHealth::aggregate(self.runner.run_all().await);
        info!(
            "Cluster is {} ({} healthy, {} warning, {} critical)",
            health.overall_status,
            health.summary[&HealthStatus::Healthy],
            health.summary[&HealthStatus::Warning],
            health.summary[&HealthStatus::Critical]
        );
        health
    }
}
