//! Metrics providers
//!
//! Each provider implements the `MetricsProvider` trait and is registered per
//! resource kind at startup. The reconciler only decides which provider to ask
//! for which metrics; how a backend is queried stays behind this trait.

mod promql;

pub use self::promql::PrometheusProvider;

use crate::catalog::ProviderQueryDescriptor;
use crate::crd::{ManagedResourceInstance, ResourceKind};
use crate::sample::GenericSample;
use async_trait::async_trait;
use cro_common::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

/// Context for a single scrape call. The orchestrator builds a new one,
/// with its own deadline, for every provider call.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeContext {
    deadline: Instant,
}

impl ScrapeContext {
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Trait for metrics providers
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Provider name for logging/metrics
    fn name(&self) -> &str;

    /// Whether this provider can serve instances deployed with `strategy`
    fn supports_strategy(&self, strategy: &str) -> bool;

    /// Fetch `descriptors` for `instance`, one sample per answered descriptor
    async fn scrape(
        &self,
        ctx: &ScrapeContext,
        instance: &ManagedResourceInstance,
        descriptors: &[ProviderQueryDescriptor],
    ) -> Result<Vec<GenericSample>>;
}

/// Providers registered for each resource kind
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ResourceKind, Vec<Arc<dyn MetricsProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ResourceKind, provider: Arc<dyn MetricsProvider>) {
        self.providers.entry(kind).or_default().push(provider);
    }

    /// Register `provider` for every resource kind
    pub fn register_all_kinds(&mut self, provider: Arc<dyn MetricsProvider>) {
        for kind in ResourceKind::ALL {
            self.register(kind, provider.clone());
        }
    }

    pub fn for_kind(&self, kind: ResourceKind) -> &[Arc<dyn MetricsProvider>] {
        self.providers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.providers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
