//! Cloud metrics reconciliation
//!
//! Resyncs the world on every pass: lists each managed resource kind,
//! scrapes its providers, publishes the samples and asks to run again after
//! the configured interval. Nothing that fails inside a pass stops the schedule.

use crate::catalog::MetricCatalog;
use crate::crd::ResourceKind;
use crate::listing::ResourceLister;
use crate::metrics;
use crate::providers::ProviderRegistry;
use crate::publisher::publish;
use crate::scrape::scrape_all;
use cro_common::Result;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

/// What triggered a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileRequest {
    /// One-shot kick sent at startup
    Initial,
    /// Self-requeue after the previous pass
    Requeue,
}

/// Directive returned by every pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requeue {
    pub after: Duration,
}

/// Reconciler context
pub struct Context {
    pub lister: Arc<dyn ResourceLister>,
    pub providers: ProviderRegistry,
    pub catalogs: Vec<MetricCatalog>,
    pub resync_interval: Duration,
    pub scrape_timeout: Duration,
}

impl Context {
    /// Context with the built-in catalog of every kind
    pub fn new(
        lister: Arc<dyn ResourceLister>,
        providers: ProviderRegistry,
        resync_interval: Duration,
        scrape_timeout: Duration,
    ) -> Result<Self> {
        let catalogs = ResourceKind::ALL
            .iter()
            .map(|kind| MetricCatalog::for_kind(*kind))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            lister,
            providers,
            catalogs,
            resync_interval,
            scrape_timeout,
        })
    }

    pub fn catalog(&self, kind: ResourceKind) -> Option<&MetricCatalog> {
        self.catalogs.iter().find(|c| c.kind() == kind)
    }

    /// Expose every catalog gauge through `registry`
    pub fn register_catalogs(&self, registry: &Registry) -> Result<()> {
        for catalog in &self.catalogs {
            catalog.register_all(registry)?;
        }
        Ok(())
    }
}

/// Run one pass over every managed resource kind
#[instrument(skip(ctx), fields(controller = "cloudmetrics", action = "reconcile_metrics"))]
pub async fn reconcile(request: ReconcileRequest, ctx: Arc<Context>) -> Requeue {
    info!("Reconciling CloudMetrics");
    let started = std::time::Instant::now();
    let mut degraded = false;

    for kind in ResourceKind::ALL {
        if let Err(e) = reconcile_kind(kind, &ctx).await {
            error!(kind = %kind, error = %e, "Failed to reconcile metrics for kind");
            metrics::record_list_error(kind.as_str());
            degraded = true;
        }
    }

    let outcome = if degraded { "degraded" } else { "clean" };
    metrics::record_pass(outcome, started.elapsed().as_secs_f64());
    info!(
        outcome,
        requeue_after_secs = ctx.resync_interval.as_secs(),
        "CloudMetrics pass complete"
    );

    Requeue {
        after: ctx.resync_interval,
    }
}

async fn reconcile_kind(kind: ResourceKind, ctx: &Context) -> Result<()> {
    let instances = ctx.lister.list(kind).await?;

    if instances.is_empty() {
        info!("Found no {} instances", kind);
        return Ok(());
    }
    for instance in &instances {
        info!("Found {} cr: {}", kind, instance.name);
    }

    let Some(catalog) = ctx.catalog(kind) else {
        info!(kind = %kind, "No metric catalog for kind, skipping");
        return Ok(());
    };

    let samples = scrape_all(
        kind,
        &instances,
        ctx.providers.for_kind(kind),
        catalog,
        ctx.scrape_timeout,
    )
    .await;

    let stats = publish(catalog, &samples);
    metrics::record_published(kind.as_str(), stats.published, stats.dropped);
    info!(
        kind = %kind,
        instances = instances.len(),
        published = stats.published,
        "Published metrics"
    );

    Ok(())
}
