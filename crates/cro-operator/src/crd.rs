//! Kubernetes Custom Resource Definitions for managed data stores
//!
//! Only the fields the metrics controller reads are modelled here. The
//! provisioning controllers own these resources; this operator never writes them.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label carrying the product a managed resource belongs to
pub const PRODUCT_NAME_LABEL: &str = "productName";

/// Redis Custom Resource
///
/// A managed cache instance realised by the backend named in `type`.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "integreatly.org",
    version = "v1alpha1",
    kind = "Redis",
    plural = "redis",
    status = "ResourceStatus",
    namespaced,
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RedisSpec {
    /// Deployment strategy, e.g. `aws` or `openshift`
    #[serde(rename = "type")]
    pub strategy_type: String,

    /// Sizing tier
    #[serde(default)]
    pub tier: String,

    /// Secret the connection details are written to
    #[serde(default)]
    pub secret_ref: Option<SecretRef>,
}

/// Postgres Custom Resource
///
/// A managed relational database instance realised by the backend named in `type`.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "integreatly.org",
    version = "v1alpha1",
    kind = "Postgres",
    plural = "postgres",
    status = "ResourceStatus",
    namespaced,
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PostgresSpec {
    /// Deployment strategy, e.g. `aws` or `openshift`
    #[serde(rename = "type")]
    pub strategy_type: String,

    /// Sizing tier
    #[serde(default)]
    pub tier: String,

    /// Secret the connection details are written to
    #[serde(default)]
    pub secret_ref: Option<SecretRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub name: String,
    pub namespace: Option<String>,
}

/// Status shared by both managed resource kinds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    pub phase: Option<String>,
    pub message: Option<String>,
    pub strategy: Option<String>,
    pub provider: Option<String>,
    /// Identifier of the instance on the provider side
    pub instance_id: Option<String>,
}

/// The managed resource kinds this controller scrapes, in pass order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Redis,
    Postgres,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Redis, ResourceKind::Postgres];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Redis => "redis",
            ResourceKind::Postgres => "postgres",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of one managed resource, taken once per pass
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedResourceInstance {
    pub name: String,
    pub namespace: String,
    pub strategy: String,
    pub cluster_id: String,
    pub resource_id: String,
    pub instance_id: String,
    pub product_name: String,
}

impl ManagedResourceInstance {
    fn from_parts<K: ResourceExt>(
        resource: &K,
        strategy: &str,
        status: Option<&ResourceStatus>,
        cluster_id: &str,
    ) -> Self {
        let name = resource.name_any();
        let instance_id = status
            .and_then(|s| s.instance_id.clone())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| name.clone());

        Self {
            namespace: resource.namespace().unwrap_or_default(),
            strategy: strategy.to_string(),
            cluster_id: cluster_id.to_string(),
            resource_id: name.clone(),
            instance_id,
            product_name: resource
                .labels()
                .get(PRODUCT_NAME_LABEL)
                .cloned()
                .unwrap_or_default(),
            name,
        }
    }

    pub fn from_redis(redis: &Redis, cluster_id: &str) -> Self {
        Self::from_parts(redis, &redis.spec.strategy_type, redis.status.as_ref(), cluster_id)
    }

    pub fn from_postgres(postgres: &Postgres, cluster_id: &str) -> Self {
        Self::from_parts(
            postgres,
            &postgres.spec.strategy_type,
            postgres.status.as_ref(),
            cluster_id,
        )
    }

    /// `namespace/name`, used in log fields and error messages
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn redis(name: &str, strategy: &str) -> Redis {
        let mut redis = Redis::new(
            name,
            RedisSpec {
                strategy_type: strategy.to_string(),
                tier: "production".into(),
                secret_ref: None,
            },
        );
        redis.metadata.namespace = Some("ns1".into());
        redis
    }

    #[test]
    fn test_instance_from_redis_defaults() {
        let instance = ManagedResourceInstance::from_redis(&redis("r1", "aws"), "c1");

        assert_eq!(instance.name, "r1");
        assert_eq!(instance.namespace, "ns1");
        assert_eq!(instance.strategy, "aws");
        assert_eq!(instance.cluster_id, "c1");
        assert_eq!(instance.resource_id, "r1");
        // Falls back to the resource name until the provider id is recorded
        assert_eq!(instance.instance_id, "r1");
        assert_eq!(instance.product_name, "");
    }

    #[test]
    fn test_instance_from_postgres_uses_status_and_labels() {
        let mut postgres = Postgres::new(
            "pg",
            PostgresSpec {
                strategy_type: "aws".into(),
                tier: "production".into(),
                secret_ref: None,
            },
        );
        postgres.metadata.namespace = Some("ns2".into());
        postgres.metadata.labels = Some(BTreeMap::from([(
            PRODUCT_NAME_LABEL.to_string(),
            "p1".to_string(),
        )]));
        postgres.status = Some(ResourceStatus {
            instance_id: Some("i1".into()),
            ..Default::default()
        });

        let instance = ManagedResourceInstance::from_postgres(&postgres, "c1");
        assert_eq!(instance.instance_id, "i1");
        assert_eq!(instance.product_name, "p1");
        assert_eq!(instance.key(), "ns2/pg");
    }

    #[test]
    fn test_spec_type_field_name() {
        let spec: RedisSpec = serde_json::from_str(r#"{"type":"openshift","tier":"dev"}"#).unwrap();
        assert_eq!(spec.strategy_type, "openshift");
        assert!(spec.secret_ref.is_none());
    }
}
