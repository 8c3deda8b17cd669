use anyhow::{Context, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::report::OutputFormat;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Path to the kubeconfig file (default: inferred from environment)
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use (default: current context)
    pub context: Option<String>,

    /// Default namespace for the client
    pub namespace: Option<String>,

    /// Report format
    #[serde(default)]
    pub output: OutputFormat,

    /// Timeout for the API server reachability check in seconds
    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,

    /// Timeout for list based checks in seconds
    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,

    /// Namespaces inspected by the system pod check
    #[serde(default = "default_system_namespaces")]
    pub system_namespaces: Vec<String>,

    /// CPU usage percent above which a node is flagged
    #[serde(default = "default_threshold")]
    pub cpu_threshold: f64,

    /// Memory usage percent above which a node is flagged
    #[serde(default = "default_threshold")]
    pub memory_threshold: f64,
}

fn default_api_timeout() -> u64 {
    10
}

fn default_list_timeout() -> u64 {
    30
}

fn default_system_namespaces() -> Vec<String> {
    vec![
        "kube-system".to_string(),
        "kube-public".to_string(),
        "kube-node-lease".to_string(),
    ]
}

fn default_threshold() -> f64 {
    80.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            namespace: None,
            output: OutputFormat::default(),
            api_timeout_secs: default_api_timeout(),
            list_timeout_secs: default_list_timeout(),
            system_namespaces: default_system_namespaces(),
            cpu_threshold: default_threshold(),
            memory_threshold: default_threshold(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// An explicitly given file must exist, the default `config.yaml` may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::from(Path::new("config.yaml")).required(false),
        };

        Config::builder()
            .add_source(file)
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}
