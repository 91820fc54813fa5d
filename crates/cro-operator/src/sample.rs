//! Provider-neutral metric samples

use crate::crd::ManagedResourceInstance;

/// Label names of every exposed series, in `with_label_values` order
pub const LABEL_NAMES: [&str; 6] = [
    "clusterID",
    "resourceID",
    "namespace",
    "instanceID",
    "productName",
    "strategy",
];

/// Identity of one time series within a catalog gauge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SampleLabels {
    pub cluster_id: String,
    pub resource_id: String,
    pub namespace: String,
    pub instance_id: String,
    pub product_name: String,
    pub strategy: String,
}

impl SampleLabels {
    pub fn for_instance(instance: &ManagedResourceInstance) -> Self {
        Self {
            cluster_id: instance.cluster_id.clone(),
            resource_id: instance.resource_id.clone(),
            namespace: instance.namespace.clone(),
            instance_id: instance.instance_id.clone(),
            product_name: instance.product_name.clone(),
            strategy: instance.strategy.clone(),
        }
    }

    /// Label values matching `LABEL_NAMES`
    pub fn values(&self) -> [&str; 6] {
        [
            self.cluster_id.as_str(),
            self.resource_id.as_str(),
            self.namespace.as_str(),
            self.instance_id.as_str(),
            self.product_name.as_str(),
            self.strategy.as_str(),
        ]
    }
}

/// One value returned by a provider, keyed by catalog metric name
#[derive(Debug, Clone, PartialEq)]
pub struct GenericSample {
    pub name: String,
    pub value: f64,
    pub labels: SampleLabels,
}

impl GenericSample {
    pub fn new(name: impl Into<String>, value: f64, labels: SampleLabels) -> Self {
        Self {
            name: name.into(),
            value,
            labels,
        }
    }
}
