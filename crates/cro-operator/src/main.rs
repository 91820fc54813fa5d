//! Cloud Resource Operator: cloud metrics controller
//!
//! Periodically lists every managed Redis and Postgres resource, asks the
//! provider matching each resource's deployment strategy for its metrics and
//! republishes them as uniformly labelled gauges on `/metrics`.

mod catalog;
mod crd;
mod dispatch;
mod http_api;
mod listing;
mod metrics;
mod providers;
mod publisher;
mod reconciler;
mod sample;
mod scheduler;
mod scrape;
mod telemetry;

use crate::http_api::AppState;
use crate::listing::KubeResourceLister;
use crate::providers::{PrometheusProvider, ProviderRegistry};
use crate::reconciler::Context;
use clap::Parser;
use cro_common::config::{split_list, DEFAULT_RESYNC_INTERVAL_SECS};
use cro_common::{OperatorSettings, PrometheusSettings, TelemetrySettings};
use kube::Client;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "cro-operator")]
#[command(about = "Cloud Resource Operator - cloud metrics controller")]
struct Args {
    /// Seconds between two full metric resyncs
    #[arg(long, env = "RESYNC_INTERVAL_SECS", default_value_t = DEFAULT_RESYNC_INTERVAL_SECS)]
    resync_interval_secs: u64,

    /// Cluster identifier attached to every published series
    #[arg(long, env = "CLUSTER_ID", default_value = "unknown")]
    cluster_id: String,

    /// Address for the metrics and health endpoints
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8383")]
    metrics_addr: SocketAddr,

    /// Prometheus base URL; enables the in-cluster provider
    #[arg(long, env = "PROMETHEUS_URL")]
    prometheus_url: Option<String>,

    /// Strategies served by the Prometheus provider (comma separated)
    #[arg(long, env = "PROMETHEUS_STRATEGIES", default_value = "openshift")]
    prometheus_strategies: String,

    /// Range window for Prometheus `<stat>_over_time` queries
    #[arg(long, env = "QUERY_WINDOW", default_value = "5m")]
    query_window: String,

    /// Upper bound for a single provider scrape, in seconds
    #[arg(long, env = "SCRAPE_TIMEOUT_SECS", default_value_t = 30)]
    scrape_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long, env = "JSON_LOGS", default_value_t = false)]
    json_logs: bool,
}

impl From<Args> for OperatorSettings {
    fn from(args: Args) -> Self {
        Self {
            resync_interval_secs: args.resync_interval_secs,
            cluster_id: args.cluster_id,
            scrape_timeout_secs: args.scrape_timeout_secs,
            metrics_addr: args.metrics_addr,
            telemetry: TelemetrySettings {
                log_level: args.log_level,
                json_logs: args.json_logs,
            },
            prometheus: args.prometheus_url.map(|url| PrometheusSettings {
                url,
                strategies: split_list(&args.prometheus_strategies),
                query_window: args.query_window,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let settings: OperatorSettings = Args::parse().into();

    telemetry::init(&settings.telemetry)?;

    info!("Starting cloud metrics controller");
    info!("  Cluster ID: {}", settings.cluster_id);
    info!("  Resync interval: {}s", settings.resync_interval_secs);
    info!("  Metrics address: {}", settings.metrics_addr);

    metrics::init_metrics();

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let mut providers = ProviderRegistry::new();
    if let Some(prometheus) = &settings.prometheus {
        info!(
            url = %prometheus.url,
            strategies = ?prometheus.strategies,
            "Registering Prometheus provider"
        );
        providers.register_all_kinds(Arc::new(PrometheusProvider::new(prometheus)?));
    }
    if providers.is_empty() {
        info!("No metrics providers configured, resources will be listed but not scraped");
    }

    let lister = Arc::new(KubeResourceLister::new(client, settings.cluster_id.clone()));
    let ctx = Arc::new(Context::new(
        lister,
        providers,
        settings.resync_interval(),
        settings.scrape_timeout(),
    )?);

    // Duplicate registration is a startup bug, fail fast
    let registry = Arc::new(Registry::new());
    ctx.register_catalogs(&registry)?;

    let ready = Arc::new(AtomicBool::new(false));
    let app = http_api::router(AppState {
        registry,
        ready: ready.clone(),
    });

    let listener = tokio::net::TcpListener::bind(settings.metrics_addr).await?;
    info!("HTTP server listening on {}", settings.metrics_addr);
    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    scheduler::run(ctx, ready, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    http_handle.abort();
    info!("Cloud metrics controller shutting down");

    Ok(())
}
