//! Prometheus-backed metrics provider
//!
//! Serves in-cluster strategies by running instant queries against the
//! cluster monitoring stack. Queried series must carry `namespace` and
//! `instance_id` labels, usually added by recording rules.

use super::{MetricsProvider, ScrapeContext};
use crate::catalog::{ProviderQueryDescriptor, Statistic};
use crate::crd::ManagedResourceInstance;
use crate::sample::{GenericSample, SampleLabels};
use async_trait::async_trait;
use cro_common::{CroError, PrometheusSettings, Result};
use serde::Deserialize;
use tracing::debug;

/// Prometheus query response structures
#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    data: Option<PrometheusData>,
}

#[derive(Debug, Deserialize)]
struct PrometheusData {
    #[serde(default)]
    result: Vec<PrometheusResult>,
}

#[derive(Debug, Deserialize)]
struct PrometheusResult {
    value: (f64, String),
}

pub struct PrometheusProvider {
    base_url: String,
    strategies: Vec<String>,
    query_window: String,
    http_client: reqwest::Client,
}

impl PrometheusProvider {
    pub fn new(settings: &PrometheusSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder().build()?;

        Ok(Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            strategies: settings.strategies.clone(),
            query_window: settings.query_window.clone(),
            http_client,
        })
    }

    /// Render the query for one descriptor, scoped to the instance's
    /// `namespace` and `instance_id` series labels.
    fn build_query(
        &self,
        instance: &ManagedResourceInstance,
        descriptor: &ProviderQueryDescriptor,
    ) -> String {
        let function = match descriptor.statistic {
            Statistic::Average => "avg_over_time",
            Statistic::Minimum => "min_over_time",
        };

        format!(
            r#"{}({}{{namespace="{}",instance_id="{}"}}[{}])"#,
            function,
            descriptor.provider_metric_name,
            escape_label_value(&instance.namespace),
            escape_label_value(&instance.instance_id),
            self.query_window
        )
    }

    /// Query Prometheus for a single value. `None` when the query matched nothing.
    async fn query(&self, ctx: &ScrapeContext, query: &str) -> Result<Option<f64>> {
        let url = format!(
            "{}/api/v1/query?query={}",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self
            .http_client
            .get(&url)
            .timeout(ctx.remaining())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CroError::ProviderQuery(format!(
                "Prometheus query failed with status: {}",
                response.status()
            )));
        }

        let prom_response: PrometheusResponse = response.json().await?;
        parse_value(prom_response)
    }
}

fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn parse_value(response: PrometheusResponse) -> Result<Option<f64>> {
    if response.status != "success" {
        return Err(CroError::ProviderQuery(format!(
            "Prometheus query status: {} {}",
            response.status,
            response.error.unwrap_or_default()
        )));
    }

    match response.data.and_then(|d| d.result.into_iter().next()) {
        Some(result) => {
            let value: f64 = result.value.1.parse().map_err(|e| {
                CroError::ProviderQuery(format!("invalid sample value {:?}: {}", result.value.1, e))
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl MetricsProvider for PrometheusProvider {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn supports_strategy(&self, strategy: &str) -> bool {
        self.strategies.iter().any(|s| s == strategy)
    }

    async fn scrape(
        &self,
        ctx: &ScrapeContext,
        instance: &ManagedResourceInstance,
        descriptors: &[ProviderQueryDescriptor],
    ) -> Result<Vec<GenericSample>> {
        let labels = SampleLabels::for_instance(instance);
        let mut samples = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let query = self.build_query(instance, descriptor);
            match self.query(ctx, &query).await? {
                Some(value) => samples.push(GenericSample::new(
                    descriptor.catalog_metric_name.clone(),
                    value,
                    labels.clone(),
                )),
                None => debug!(
                    metric = %descriptor.catalog_metric_name,
                    resource = %instance.key(),
                    "Prometheus returned no series"
                ),
            }
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::Instant;

    fn provider() -> PrometheusProvider {
        PrometheusProvider::new(&PrometheusSettings {
            url: "http://prometheus:9090/".into(),
            strategies: vec!["openshift".into()],
            query_window: "5m".into(),
        })
        .unwrap()
    }

    fn instance() -> ManagedResourceInstance {
        ManagedResourceInstance {
            name: "pg".into(),
            namespace: "ns1".into(),
            strategy: "openshift".into(),
            cluster_id: "c1".into(),
            resource_id: "pg".into(),
            instance_id: "i1".into(),
            product_name: "p1".into(),
        }
    }

    #[test]
    fn test_supports_configured_strategies_only() {
        let provider = provider();
        assert!(provider.supports_strategy("openshift"));
        assert!(!provider.supports_strategy("aws"));
        assert_eq!(provider.base_url, "http://prometheus:9090");
    }

    fn descriptor(provider_metric: &str, statistic: Statistic) -> ProviderQueryDescriptor {
        ProviderQueryDescriptor {
            catalog_metric_name: format!("cro_{}", provider_metric),
            provider_metric_name: provider_metric.into(),
            statistic,
        }
    }

    #[test]
    fn test_build_query_scopes_plain_metric_to_instance() {
        let instance = ManagedResourceInstance {
            name: "r1".into(),
            ..instance()
        };

        assert_eq!(
            provider().build_query(&instance, &descriptor("redis_memory_used_bytes", Statistic::Minimum)),
            r#"min_over_time(redis_memory_used_bytes{namespace="ns1",instance_id="i1"}[5m])"#
        );
        assert_eq!(
            provider().build_query(&instance, &descriptor("postgres:free_storage:bytes", Statistic::Average)),
            r#"avg_over_time(postgres:free_storage:bytes{namespace="ns1",instance_id="i1"}[5m])"#
        );
    }

    #[test]
    fn test_build_query_escapes_label_values() {
        let instance = ManagedResourceInstance {
            instance_id: r#"a"b"#.into(),
            ..instance()
        };

        assert_eq!(
            provider().build_query(&instance, &descriptor("m", Statistic::Average)),
            r#"avg_over_time(m{namespace="ns1",instance_id="a\"b"}[5m])"#
        );
    }

    #[test]
    fn test_parse_value() {
        let ok: PrometheusResponse = serde_json::from_str(
            r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{},"value":[1700000000.1,"4096"]}]}}"#,
        )
        .unwrap();
        assert_eq!(parse_value(ok).unwrap(), Some(4096.0));

        let empty: PrometheusResponse = serde_json::from_str(
            r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#,
        )
        .unwrap();
        assert_eq!(parse_value(empty).unwrap(), None);

        let failed: PrometheusResponse =
            serde_json::from_str(r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#)
                .unwrap();
        assert_eq!(parse_value(failed).unwrap_err().code(), "PROVIDER_QUERY");
    }

    /// In-process Prometheus answering by metric name. Returns its base URL and
    /// the queries it received.
    async fn serve_prometheus() -> (String, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();

        let app = Router::new().route(
            "/api/v1/query",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let recorded = recorded.clone();
                async move {
                    let query = params.get("query").cloned().unwrap_or_default();
                    recorded.lock().push(query.clone());

                    if query.contains("unavailable_metric") {
                        return (StatusCode::SERVICE_UNAVAILABLE, String::new());
                    }
                    if query.contains("slow_metric") {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    let body = if query.contains("absent_metric") {
                        r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#
                    } else {
                        r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{},"value":[1700000000.1,"4096"]}]}}"#
                    };
                    (StatusCode::OK, body.to_string())
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), seen)
    }

    fn provider_at(url: &str) -> PrometheusProvider {
        PrometheusProvider::new(&PrometheusSettings {
            url: url.into(),
            strategies: vec!["openshift".into()],
            query_window: "5m".into(),
        })
        .unwrap()
    }

    fn context(timeout: Duration) -> ScrapeContext {
        ScrapeContext::new(Instant::now() + timeout)
    }

    #[tokio::test]
    async fn test_scrape_skips_descriptors_without_series() {
        let (url, seen) = serve_prometheus().await;
        let descriptors = [
            descriptor("absent_metric", Statistic::Average),
            descriptor("redis_memory_used_bytes", Statistic::Average),
        ];

        let samples = provider_at(&url)
            .scrape(&context(Duration::from_secs(5)), &instance(), &descriptors)
            .await
            .unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "cro_redis_memory_used_bytes");
        assert_eq!(samples[0].value, 4096.0);
        assert_eq!(samples[0].labels.instance_id, "i1");

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1],
            r#"avg_over_time(redis_memory_used_bytes{namespace="ns1",instance_id="i1"}[5m])"#
        );
    }

    #[tokio::test]
    async fn test_scrape_empty_result_is_not_an_error() {
        let (url, _) = serve_prometheus().await;
        let descriptors = [descriptor("absent_metric", Statistic::Minimum)];

        let samples = provider_at(&url)
            .scrape(&context(Duration::from_secs(5)), &instance(), &descriptors)
            .await
            .unwrap();

        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_fails_whole_call_on_error_status() {
        let (url, seen) = serve_prometheus().await;
        let descriptors = [
            descriptor("redis_memory_used_bytes", Statistic::Average),
            descriptor("unavailable_metric", Statistic::Average),
            descriptor("redis_cpu_seconds", Statistic::Average),
        ];

        let err = provider_at(&url)
            .scrape(&context(Duration::from_secs(5)), &instance(), &descriptors)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "PROVIDER_QUERY");
        assert!(err.to_string().contains("503"));
        // Stops at the failing descriptor
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_scrape_fails_on_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider_at(&format!("http://{}", addr))
            .scrape(
                &context(Duration::from_secs(5)),
                &instance(),
                &[descriptor("redis_memory_used_bytes", Statistic::Average)],
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), "HTTP_ERROR");
    }

    #[tokio::test]
    async fn test_query_honours_context_deadline() {
        let (url, _) = serve_prometheus().await;
        let started = std::time::Instant::now();

        let err = provider_at(&url)
            .scrape(
                &context(Duration::from_millis(200)),
                &instance(),
                &[descriptor("slow_metric", Statistic::Average)],
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), "HTTP_ERROR");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
