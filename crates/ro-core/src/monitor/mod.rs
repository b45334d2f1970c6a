//! Monitoring source: context, performance, and resource-usage samples.
//!
//! The core depends only on the [`MonitoringSource`] capability. Samples
//! are plain reals; implementations fold query failures into 0.0 so a
//! flaky metrics backend degrades the signal rather than the loop.

pub mod prometheus;

pub use prometheus::PrometheusMonitoring;

use serde::Serialize;

/// Context metrics for one iteration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextSample {
    pub workload: f64,
    pub cpu_util: f64,
    pub mem_util: f64,
    pub net_util: f64,
    /// Present when the backend serves a spot-price signal (public mode).
    pub spot_price: Option<f64>,
}

/// Performance metrics for one iteration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceSample {
    /// Batch job completion signal.
    pub job_time: f64,
    /// Microservice latency signal.
    pub p90_latency: f64,
}

/// Observed resource consumption of the workload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceUsageSample {
    pub cpu: f64,
    /// Bytes.
    pub memory: f64,
    pub network: f64,
}

/// Capability interface over the metrics backend.
pub trait MonitoringSource {
    fn get_context(&self) -> ContextSample;
    fn get_performance_metrics(&self) -> PerformanceSample;
    fn get_resource_usage(&self) -> ResourceUsageSample;
}
