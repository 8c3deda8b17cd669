use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Severity of a single check or of the whole cluster.
///
/// Only the label is ever serialized. The rank used for aggregation and
/// sorting stays internal so the JSON contract does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// All severities, least severe first
    pub const ALL: [HealthStatus; 3] = [
        HealthStatus::Healthy,
        HealthStatus::Warning,
        HealthStatus::Critical,
    ];

    pub(crate) fn rank(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 1,
            HealthStatus::Warning => 2,
            HealthStatus::Critical => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Warning => "Warning",
            HealthStatus::Critical => "Critical",
        }
    }

    /// Marker printed in front of each check in the text report
    pub fn icon(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✅",
            HealthStatus::Warning => "⚠️",
            HealthStatus::Critical => "❌",
        }
    }
}

impl Display for HealthStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
