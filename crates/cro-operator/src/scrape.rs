//! Scrape orchestration
//!
//! Runs every dispatched provider against every instance of one kind and
//! gathers the returned samples. A failing provider only loses its own samples.

use crate::catalog::MetricCatalog;
use crate::crd::{ManagedResourceInstance, ResourceKind};
use crate::dispatch::dispatch;
use crate::metrics;
use crate::providers::{MetricsProvider, ScrapeContext};
use crate::sample::GenericSample;
use cro_common::CroError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Scrape all `instances` of `kind`. Each provider call is bounded by `scrape_timeout`.
pub async fn scrape_all(
    kind: ResourceKind,
    instances: &[ManagedResourceInstance],
    providers: &[Arc<dyn MetricsProvider>],
    catalog: &MetricCatalog,
    scrape_timeout: Duration,
) -> Vec<GenericSample> {
    let mut samples = Vec::new();

    for instance in instances {
        let dispatched = dispatch(providers, catalog, &instance.strategy);
        if dispatched.is_empty() {
            info!(
                kind = %kind,
                resource = %instance.key(),
                strategy = %instance.strategy,
                "No provider serves strategy, skipping"
            );
            continue;
        }

        for target in dispatched {
            let provider = target.provider.name().to_string();
            let ctx = ScrapeContext::new(Instant::now() + scrape_timeout);

            let result = match timeout_at(
                ctx.deadline(),
                target.provider.scrape(&ctx, instance, &target.descriptors),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(CroError::ScrapeTimeout {
                    provider: provider.clone(),
                    resource: instance.key(),
                }),
            };

            match result {
                Ok(mut scraped) => {
                    debug!(
                        kind = %kind,
                        provider = %provider,
                        resource = %instance.key(),
                        count = scraped.len(),
                        "Scraped samples"
                    );
                    samples.append(&mut scraped);
                }
                Err(e) => {
                    warn!(
                        kind = %kind,
                        provider = %provider,
                        resource = %instance.key(),
                        error = %e,
                        "Failed to scrape metrics"
                    );
                    metrics::record_scrape_error(kind.as_str(), &provider);
                }
            }
        }
    }

    samples
}
