//! Resource listing
//!
//! Snapshots every managed resource of a kind, cluster wide.

use crate::crd::{ManagedResourceInstance, Postgres, Redis, ResourceKind};
use async_trait::async_trait;
use cro_common::{CroError, Result};
use kube::api::{Api, ListParams};
use kube::Client;

/// Read-only listing of managed resources
#[async_trait]
pub trait ResourceLister: Send + Sync {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ManagedResourceInstance>>;
}

/// Lists the custom resources through the Kubernetes API
pub struct KubeResourceLister {
    client: Client,
    cluster_id: String,
}

impl KubeResourceLister {
    pub fn new(client: Client, cluster_id: impl Into<String>) -> Self {
        Self {
            client,
            cluster_id: cluster_id.into(),
        }
    }
}

#[async_trait]
impl ResourceLister for KubeResourceLister {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ManagedResourceInstance>> {
        let params = ListParams::default();

        let instances = match kind {
            ResourceKind::Redis => {
                let api: Api<Redis> = Api::all(self.client.clone());
                api.list(&params)
                    .await
                    .map_err(|e| CroError::list_failed(kind.as_str(), e))?
                    .items
                    .iter()
                    .map(|r| ManagedResourceInstance::from_redis(r, &self.cluster_id))
                    .collect()
            }
            ResourceKind::Postgres => {
                let api: Api<Postgres> = Api::all(self.client.clone());
                api.list(&params)
                    .await
                    .map_err(|e| CroError::list_failed(kind.as_str(), e))?
                    .items
                    .iter()
                    .map(|p| ManagedResourceInstance::from_postgres(p, &self.cluster_id))
                    .collect()
            }
        };

        Ok(instances)
    }
}
