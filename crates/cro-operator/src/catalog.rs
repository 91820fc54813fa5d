//! Metric Catalog
//!
//! Static registry of the provider-neutral metrics exposed per resource kind.
//! Every entry owns its display gauge and, per deployment strategy, the
//! descriptor a provider needs to fetch the value.

use crate::crd::ResourceKind;
use crate::sample::LABEL_NAMES;
use cro_common::Result;
use prometheus::{GaugeVec, Opts, Registry};
use std::collections::HashMap;
use std::fmt;

/// Strategy identifier for AWS managed services
pub const STRATEGY_AWS: &str = "aws";
/// Strategy identifier for in-cluster workloads
pub const STRATEGY_OPENSHIFT: &str = "openshift";

/// Aggregation a provider applies over its sampling window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Average,
    Minimum,
}

/// How to ask one provider for one catalog metric
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQueryDescriptor {
    pub catalog_metric_name: String,
    pub provider_metric_name: String,
    pub statistic: Statistic,
}

/// One exposed metric
#[derive(Clone)]
pub struct MetricDefinition {
    pub name: String,
    pub gauge: GaugeVec,
    queries: HashMap<String, ProviderQueryDescriptor>,
}

impl MetricDefinition {
    pub fn new(name: &str, help: &str) -> Result<Self> {
        let gauge = GaugeVec::new(Opts::new(name, help), &LABEL_NAMES)?;
        Ok(Self {
            name: name.to_string(),
            gauge,
            queries: HashMap::new(),
        })
    }

    /// Add the query used for `strategy`
    pub fn with_query(mut self, strategy: &str, provider_metric: &str, statistic: Statistic) -> Self {
        self.queries.insert(
            strategy.to_string(),
            ProviderQueryDescriptor {
                catalog_metric_name: self.name.clone(),
                provider_metric_name: provider_metric.to_string(),
                statistic,
            },
        );
        self
    }

    pub fn query_for(&self, strategy: &str) -> Option<&ProviderQueryDescriptor> {
        self.queries.get(strategy)
    }
}

impl fmt::Debug for MetricDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricDefinition")
            .field("name", &self.name)
            .field("queries", &self.queries)
            .finish_non_exhaustive()
    }
}

/// The metrics exposed for one resource kind
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    kind: ResourceKind,
    definitions: Vec<MetricDefinition>,
}

impl MetricCatalog {
    pub fn new(kind: ResourceKind, definitions: Vec<MetricDefinition>) -> Self {
        Self { kind, definitions }
    }

    /// Built-in catalog for `kind`
    pub fn for_kind(kind: ResourceKind) -> Result<Self> {
        match kind {
            ResourceKind::Redis => Self::redis(),
            ResourceKind::Postgres => Self::postgres(),
        }
    }

    pub fn redis() -> Result<Self> {
        let definitions = vec![
            MetricDefinition::new(
                "cro_redis_memory_usage_percentage_average",
                "Percentage of redis memory in use",
            )?
            .with_query(STRATEGY_AWS, "DatabaseMemoryUsagePercentage", Statistic::Average)
            .with_query(STRATEGY_OPENSHIFT, "redis:memory_usage:percent", Statistic::Average),
            MetricDefinition::new(
                "cro_redis_freeable_memory_average",
                "Amount of free memory available on the redis host, in bytes",
            )?
            .with_query(STRATEGY_AWS, "FreeableMemory", Statistic::Average)
            .with_query(STRATEGY_OPENSHIFT, "redis:memory_freeable:bytes", Statistic::Average),
            MetricDefinition::new(
                "cro_redis_cpu_utilization_average",
                "Percentage of CPU utilization of the redis host",
            )?
            .with_query(STRATEGY_AWS, "CPUUtilization", Statistic::Average)
            .with_query(STRATEGY_OPENSHIFT, "redis:cpu_utilization:percent", Statistic::Average),
            MetricDefinition::new(
                "cro_redis_engine_cpu_utilization_average",
                "Percentage of CPU utilization of the redis engine thread",
            )?
            .with_query(STRATEGY_AWS, "EngineCPUUtilization", Statistic::Average),
        ];
        Ok(Self::new(ResourceKind::Redis, definitions))
    }

    pub fn postgres() -> Result<Self> {
        let definitions = vec![
            MetricDefinition::new(
                "cro_postgres_free_storage_average",
                "Amount of available storage space, in bytes",
            )?
            .with_query(STRATEGY_AWS, "FreeStorageSpace", Statistic::Average)
            .with_query(STRATEGY_OPENSHIFT, "postgres:free_storage:bytes", Statistic::Average),
            MetricDefinition::new(
                "cro_postgres_free_storage_minimum",
                "Lowest available storage space over the sampling window, in bytes",
            )?
            .with_query(STRATEGY_AWS, "FreeStorageSpace", Statistic::Minimum)
            .with_query(STRATEGY_OPENSHIFT, "postgres:free_storage:bytes", Statistic::Minimum),
            MetricDefinition::new(
                "cro_postgres_cpu_utilization_average",
                "Percentage of CPU utilization of the postgres host",
            )?
            .with_query(STRATEGY_AWS, "CPUUtilization", Statistic::Average)
            .with_query(STRATEGY_OPENSHIFT, "postgres:cpu_utilization:percent", Statistic::Average),
            MetricDefinition::new(
                "cro_postgres_freeable_memory_average",
                "Amount of available random access memory, in bytes",
            )?
            .with_query(STRATEGY_AWS, "FreeableMemory", Statistic::Average)
            .with_query(STRATEGY_OPENSHIFT, "postgres:memory_freeable:bytes", Statistic::Average),
        ];
        Ok(Self::new(ResourceKind::Postgres, definitions))
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// First definition named `name`
    pub fn find(&self, name: &str) -> Option<&MetricDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Descriptors a provider serving `strategy` should be asked for
    pub fn descriptors_for(&self, strategy: &str) -> Vec<ProviderQueryDescriptor> {
        self.definitions
            .iter()
            .filter_map(|d| d.query_for(strategy).cloned())
            .collect()
    }

    /// Expose every gauge through `registry`. Must run once, before the first pass.
    pub fn register_all(&self, registry: &Registry) -> Result<()> {
        for definition in &self.definitions {
            registry.register(Box::new(definition.gauge.clone()))?;
        }
        Ok(())
    }
}
