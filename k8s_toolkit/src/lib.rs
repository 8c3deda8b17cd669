pub mod checks;
pub mod cluster;
pub mod health;
pub mod quantity;
pub mod report;
pub mod settings;
pub mod status;

#[cfg(test)]
mod mocks;

pub use checks::{CheckError, CheckResult, CheckRunner, HealthCheck, default_checks};
pub use cluster::{ClusterClient, KubeClusterClient};
pub use health::{ClusterHealth, HealthChecker};
pub use report::{OutputFormat, render};
pub use settings::Settings;
pub use status::HealthStatus;
