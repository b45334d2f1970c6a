//! Cluster mutation sink: read the live resource spec, write a new one.
//!
//! The core depends only on the [`ClusterMutator`] capability; the default
//! implementation in [`kube`] speaks to the Kubernetes API server over
//! HTTP.

pub mod kube;

pub use kube::{KubeApi, KubeClusterClient};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from cluster operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("unexpected API response: {0}")]
    Malformed(String),

    #[error("cluster environment not configured: {0}")]
    Environment(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ClusterError> for ro_common::Error {
    fn from(e: ClusterError) -> Self {
        ro_common::Error::Cluster(e.to_string())
    }
}

/// One cluster node with its labels and resource figures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Allocatable quantities as Kubernetes strings (`"8"`, `"16Gi"`, ...).
    #[serde(default)]
    pub allocatable: BTreeMap<String, String>,
    #[serde(default)]
    pub capacity: BTreeMap<String, String>,
}

/// Concrete cluster parameters an arm projects onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceParameters {
    /// CPU request in cores.
    pub cpu: f64,
    /// Memory request as a Kubernetes quantity string, e.g. `"512Mi"`.
    pub memory: String,
    pub replicas: u32,
    /// Zone name to preferred node hostnames.
    pub node_affinities: BTreeMap<String, Vec<String>>,
}

/// Capability interface over the cluster-mutation backend.
pub trait ClusterMutator {
    /// All nodes with labels and allocatable/capacity figures.
    fn get_nodes(&self) -> Result<Vec<NodeInfo>, ClusterError>;

    /// Current resource spec of the named workload, or `None` when no
    /// matching workload exists.
    fn get_current_resources(
        &self,
        app_name: &str,
    ) -> Result<Option<ResourceParameters>, ClusterError>;

    /// Apply a resource configuration: requests = (cpu, memory), limits =
    /// (cpu × 1.2, memory), replicas, and a preferred node-affinity block
    /// weighted 10 on `kubernetes.io/hostname`.
    ///
    /// Returns `Ok(false)` when neither a Deployment-like nor a stateful
    /// workload with the given name exists.
    fn apply_resource_action(
        &self,
        app_name: &str,
        params: &ResourceParameters,
    ) -> Result<bool, ClusterError>;
}
