//! Prometheus instant-vector monitoring source.
//!
//! Issues `GET /api/v1/query?query=<PromQL>` and reads
//! `data.result[0].value[1]`. Any failure — transport, HTTP status, shape,
//! parse — logs a warning and yields 0.0.

use crate::monitor::{ContextSample, MonitoringSource, PerformanceSample, ResourceUsageSample};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// PromQL query set for one workload.
#[derive(Debug, Clone)]
pub struct PrometheusQueries {
    pub job_time: String,
    pub p90_latency: String,
    pub workload: String,
    pub cpu_util: String,
    pub mem_util: String,
    pub net_util: String,
    pub spot_price: String,
    pub usage_cpu: String,
    pub usage_memory: String,
    pub usage_network: String,
}

impl PrometheusQueries {
    /// Default query templates for an app in a namespace.
    pub fn for_app(app_name: &str, namespace: &str) -> Self {
        PrometheusQueries {
            job_time: format!(
                r#"rate(job_completion_time_seconds{{namespace="{namespace}",app="{app_name}"}}[5m])"#
            ),
            p90_latency: format!(
                r#"histogram_quantile(0.9, sum(rate(http_request_duration_seconds_bucket{{namespace="{namespace}",app="{app_name}"}}[5m])) by (le))"#
            ),
            workload: format!(r#"sum(rate(http_requests_total{{namespace="{namespace}"}}[5m]))"#),
            cpu_util: "avg(node_cpu_utilization)".to_string(),
            mem_util: "avg(node_memory_utilization)".to_string(),
            net_util: "avg(node_network_transmit_bytes_total + node_network_receive_bytes_total)"
                .to_string(),
            // Neutral multiplier until a real spot-price exporter is wired in.
            spot_price: "vector(1)".to_string(),
            usage_cpu: format!(
                r#"sum(container_cpu_usage_seconds_total{{namespace="{namespace}",pod=~"{app_name}-.*"}})"#
            ),
            usage_memory: format!(
                r#"sum(container_memory_working_set_bytes{{namespace="{namespace}",pod=~"{app_name}-.*"}})"#
            ),
            usage_network: format!(
                r#"sum(container_network_transmit_bytes_total{{namespace="{namespace}",pod=~"{app_name}-.*"}} + container_network_receive_bytes_total{{namespace="{namespace}",pod=~"{app_name}-.*"}})"#
            ),
        }
    }
}

/// Default [`MonitoringSource`] over a Prometheus HTTP endpoint.
pub struct PrometheusMonitoring {
    agent: ureq::Agent,
    base_url: String,
    queries: PrometheusQueries,
}

impl PrometheusMonitoring {
    pub fn new(prometheus_url: &str, app_name: &str, namespace: &str) -> Self {
        Self::with_queries(
            prometheus_url,
            PrometheusQueries::for_app(app_name, namespace),
        )
    }

    pub fn with_queries(prometheus_url: &str, queries: PrometheusQueries) -> Self {
        PrometheusMonitoring {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(10))
                .build(),
            base_url: prometheus_url.trim_end_matches('/').to_string(),
            queries,
        }
    }

    /// Run one instant query; every failure path is a warning and 0.0.
    fn query(&self, query: &str) -> f64 {
        let url = format!("{}/api/v1/query", self.base_url);
        let response = match self.agent.get(&url).query("query", query).call() {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, query, "error querying Prometheus");
                return 0.0;
            }
        };
        let body: Value = match response.into_json() {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, query, "malformed Prometheus response");
                return 0.0;
            }
        };
        match parse_instant_vector(&body) {
            Some(v) => v,
            None => {
                warn!(query, "no data for query");
                0.0
            }
        }
    }
}

/// Extract `data.result[0].value[1]` from a successful instant-vector
/// response body.
pub fn parse_instant_vector(body: &Value) -> Option<f64> {
    if body["status"].as_str() != Some("success") {
        return None;
    }
    body["data"]["result"]
        .as_array()?
        .first()?
        .get("value")?
        .get(1)?
        .as_str()?
        .parse::<f64>()
        .ok()
}

impl MonitoringSource for PrometheusMonitoring {
    fn get_context(&self) -> ContextSample {
        ContextSample {
            workload: self.query(&self.queries.workload),
            cpu_util: self.query(&self.queries.cpu_util),
            mem_util: self.query(&self.queries.mem_util),
            net_util: self.query(&self.queries.net_util),
            spot_price: Some(self.query(&self.queries.spot_price)),
        }
    }

    fn get_performance_metrics(&self) -> PerformanceSample {
        PerformanceSample {
            job_time: self.query(&self.queries.job_time),
            p90_latency: self.query(&self.queries.p90_latency),
        }
    }

    fn get_resource_usage(&self) -> ResourceUsageSample {
        ResourceUsageSample {
            cpu: self.query(&self.queries.usage_cpu),
            memory: self.query(&self.queries.usage_memory),
            network: self.query(&self.queries.usage_network),
        }
    }
}
