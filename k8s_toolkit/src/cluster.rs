use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolume, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::settings::Settings;

/// Version information reported by the API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    pub git_version: String,
    pub platform: String,
}

/// Usage sample for a single node from `metrics.k8s.io`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeMetrics {
    pub name: String,
    /// Resource name (`cpu`, `memory`) to usage
    pub usage: BTreeMap<String, Quantity>,
}

/// Read-only view of the cluster used by the health checks
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn server_version(&self) -> Result<ServerVersion>;

    async fn list_nodes(&self) -> Result<Vec<Node>>;

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>>;

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>>;

    /// List node usage samples, `Ok(None)` when the metrics API is not served
    async fn list_node_metrics(&self) -> Result<Option<Vec<NodeMetrics>>>;
}

/// [ClusterClient] backed by a real API server connection
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the kubeconfig in [Settings], falling back to
    /// the default inference chain (`KUBECONFIG`, `~/.kube/config`, in-cluster)
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let options = KubeConfigOptions {
            context: settings.context.clone(),
            ..Default::default()
        };

        let mut config = match &settings.kubeconfig {
            Some(path) => {
                info!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .context("Failed to build config")?
            }
            None if settings.context.is_some() => Config::from_kubeconfig(&options)
                .await
                .context("Failed to build config")?,
            None => Config::infer().await.context("Failed to build config")?,
        };

        if let Some(ns) = &settings.namespace {
            config.default_namespace = ns.clone();
        }
        debug!("Using cluster {}", config.cluster_url);

        let client = Client::try_from(config).context("Failed to create client")?;
        Ok(Self::new(client))
    }

    fn node_metrics_api(&self) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "NodeMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "nodes");
        Api::all_with(self.client.clone(), &resource)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn server_version(&self) -> Result<ServerVersion> {
        let info = self.client.apiserver_version().await?;
        Ok(ServerVersion {
            git_version: info.git_version,
            platform: info.platform,
        })
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_node_metrics(&self) -> Result<Option<Vec<NodeMetrics>>> {
        let list = match self.node_metrics_api().list(&ListParams::default()).await {
            Ok(list) => list,
            // aggregated API not registered, or registered but metrics-server is down
            Err(kube::Error::Api(kube::core::ErrorResponse { code: 404 | 503, .. })) => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut metrics = Vec::with_capacity(list.items.len());
        for obj in list.items {
            let name = obj.name_any();
            let usage = match obj.data.get("usage") {
                Some(usage) => serde_json::from_value(usage.clone())
                    .with_context(|| format!("Invalid usage for node {}", name))?,
                None => {
                    warn!("Node metrics for {} have no usage, skipping", name);
                    continue;
                }
            };
            metrics.push(NodeMetrics { name, usage });
        }
        Ok(Some(metrics))
    }
}
