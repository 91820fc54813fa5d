//! Provider dispatch
//!
//! Picks the providers able to serve an instance's deployment strategy and
//! narrows the catalog to the descriptors each of them should be asked for.

use crate::catalog::{MetricCatalog, ProviderQueryDescriptor};
use crate::providers::MetricsProvider;
use std::sync::Arc;
use tracing::debug;

/// A provider paired with the descriptors to request from it
pub struct Dispatch {
    pub provider: Arc<dyn MetricsProvider>,
    pub descriptors: Vec<ProviderQueryDescriptor>,
}

/// Select providers for `strategy`. An empty result means the instance is skipped.
/// Nothing is dispatched when the catalog has no descriptors for `strategy`.
pub fn dispatch(
    providers: &[Arc<dyn MetricsProvider>],
    catalog: &MetricCatalog,
    strategy: &str,
) -> Vec<Dispatch> {
    let descriptors = catalog.descriptors_for(strategy);
    if descriptors.is_empty() {
        debug!(
            kind = %catalog.kind(),
            strategy = %strategy,
            "Catalog has no queries for strategy"
        );
        return Vec::new();
    }

    providers
        .iter()
        .filter(|p| p.supports_strategy(strategy))
        .map(|provider| Dispatch {
            provider: provider.clone(),
            descriptors: descriptors.clone(),
        })
        .collect()
}
