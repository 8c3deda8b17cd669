#![allow(unused)]
use anyhow::{Result, bail};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Node, NodeCondition, NodeStatus, PersistentVolume, PersistentVolumeStatus, Pod, PodStatus,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashMap};

use crate::cluster::{ClusterClient, NodeMetrics, ServerVersion};

#[derive(Debug, Clone)]
pub enum MockMetrics {
    /// metrics.k8s.io is not served
    Unavailable,
    /// metrics.k8s.io is served but the list call fails
    Failing,
    Samples(Vec<NodeMetrics>),
}

/// In-memory cluster, `None` collections fail when listed
#[derive(Debug, Clone)]
pub struct MockCluster {
    pub unreachable: bool,
    pub version: ServerVersion,
    pub nodes: Option<Vec<Node>>,
    pub pods: HashMap<String, Vec<Pod>>,
    pub failing_namespaces: Vec<String>,
    pub volumes: Option<Vec<PersistentVolume>>,
    pub metrics: MockMetrics,
}

impl Default for MockCluster {
    fn default() -> Self {
        Self {
            unreachable: false,
            version: ServerVersion {
                git_version: "v1.31.2".to_string(),
                platform: "linux/amd64".to_string(),
            },
            nodes: Some(vec![]),
            pods: HashMap::new(),
            failing_namespaces: vec![],
            volumes: Some(vec![]),
            metrics: MockMetrics::Samples(vec![]),
        }
    }
}

impl MockCluster {
    /// Every call fails as if the API server could not be reached
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    /// A node with 4 cpu / 16Gi capacity and an optional `Ready` condition (status, message)
    pub fn mock_node(name: &str, ready: Option<(&str, &str)>) -> Node {
        let conditions = ready.map(|(status, message)| {
            vec![
                NodeCondition {
                    type_: "MemoryPressure".to_string(),
                    status: "False".to_string(),
                    ..Default::default()
                },
                NodeCondition {
                    type_: "Ready".to_string(),
                    status: status.to_string(),
                    message: Some(message.to_string()),
                    ..Default::default()
                },
            ]
        });

        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions,
                capacity: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity("4".to_string())),
                    ("memory".to_string(), Quantity("16Gi".to_string())),
                    ("pods".to_string(), Quantity("110".to_string())),
                ])),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn mock_pod(name: &str, phase: Option<&str>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: phase.map(|p| p.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn mock_pv(name: &str, phase: &str) -> PersistentVolume {
        PersistentVolume {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(PersistentVolumeStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn mock_node_metrics(name: &str, cpu: &str, memory: &str) -> NodeMetrics {
        NodeMetrics {
            name: name.to_string(),
            usage: BTreeMap::from([
                ("cpu".to_string(), Quantity(cpu.to_string())),
                ("memory".to_string(), Quantity(memory.to_string())),
            ]),
        }
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.unreachable {
            bail!("error trying to connect: tcp connect error: Connection refused (os error 111)");
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn server_version(&self) -> Result<ServerVersion> {
        self.ensure_reachable()?;
        Ok(self.version.clone())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.ensure_reachable()?;
        match &self.nodes {
            Some(n) => Ok(n.clone()),
            None => bail!("nodes is forbidden: User \"system:anonymous\" cannot list resource \"nodes\""),
        }
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        self.ensure_reachable()?;
        if self.failing_namespaces.iter().any(|n| n == namespace) {
            bail!(
                "pods is forbidden: cannot list resource \"pods\" in namespace \"{}\"",
                namespace
            );
        }
        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>> {
        self.ensure_reachable()?;
        match &self.volumes {
            Some(v) => Ok(v.clone()),
            None => bail!("persistentvolumes is forbidden"),
        }
    }

    async fn list_node_metrics(&self) -> Result<Option<Vec<NodeMetrics>>> {
        self.ensure_reachable()?;
        match &self.metrics {
            MockMetrics::Unavailable => Ok(None),
            MockMetrics::Failing => bail!("the server is currently unable to handle the request"),
            MockMetrics::Samples(s) => Ok(Some(s.clone())),
        }
    }
}
