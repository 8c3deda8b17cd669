use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::checks::CheckResult;
use crate::health::ClusterHealth;
use crate::status::HealthStatus;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report sorted by severity
    #[default]
    Text,
    /// Pretty printed JSON document
    Json,
}

/// Render the health report in the requested format
pub fn render(health: &ClusterHealth, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(health).context("Failed to serialize health report")
        }
        OutputFormat::Text => {
            let mut out = String::new();
            write_text(&mut out, health).context("Failed to format health report")?;
            Ok(out)
        }
    }
}

fn write_text(out: &mut String, health: &ClusterHealth) -> std::fmt::Result {
    writeln!(out, "Kubernetes Cluster Health Report")?;
    writeln!(
        out,
        "Generated: {}",
        health.timestamp.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out, "Overall Status: {}", health.overall_status)?;
    writeln!(out)?;

    writeln!(out, "Summary:")?;
    for status in HealthStatus::ALL {
        let count = health.summary.get(&status).copied().unwrap_or(0);
        writeln!(out, "  {}: {}", status, count)?;
    }
    writeln!(out)?;

    writeln!(out, "Detailed Results:")?;
    for check in sorted_by_severity(&health.checks) {
        writeln!(
            out,
            "{} {}: {}",
            check.status.icon(),
            check.component,
            check.message
        )?;
        if check.status != HealthStatus::Healthy {
            for (key, value) in &check.details {
                writeln!(out, "    {}: {}", key, value)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Most severe first, original order kept between equal severities
fn sorted_by_severity(checks: &[CheckResult]) -> Vec<&CheckResult> {
    let mut sorted: Vec<&CheckResult> = checks.iter().collect();
    sorted.sort_by_key(|c| std::cmp::Reverse(c.status.rank()));
    sorted
}
