//! Configuration for the cloud resource operator

use std::net::SocketAddr;
use std::time::Duration;

/// Default period between two full metric resyncs, in seconds
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Operator runtime configuration
#[derive(Debug, Clone)]
pub struct OperatorSettings {
    /// Seconds between the end of one pass and the start of the next
    pub resync_interval_secs: u64,
    /// Identifier of the cluster, attached to every published series
    pub cluster_id: String,
    /// Upper bound for a single provider scrape call
    pub scrape_timeout_secs: u64,
    /// Address the metrics/health HTTP server binds to
    pub metrics_addr: SocketAddr,
    /// Logging configuration
    pub telemetry: TelemetrySettings,
    /// In-cluster Prometheus provider (disabled when absent)
    pub prometheus: Option<PrometheusSettings>,
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            cluster_id: "unknown".into(),
            scrape_timeout_secs: 30,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8383)),
            telemetry: TelemetrySettings::default(),
            prometheus: None,
        }
    }
}

impl OperatorSettings {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

/// Logging settings
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable JSON log format
    pub json_logs: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            json_logs: false,
        }
    }
}

/// Settings for the Prometheus-backed provider
#[derive(Debug, Clone)]
pub struct PrometheusSettings {
    /// Base URL of the Prometheus HTTP API
    pub url: String,
    /// Deployment strategies this provider answers for
    pub strategies: Vec<String>,
    /// Range selector used for `<stat>_over_time` queries
    pub query_window: String,
}

/// Split a comma separated list, dropping empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
