//! Objective and resource-budget enforcement.
//!
//! `ObjectiveWeights` turns raw reward weights into normalised ones before
//! they reach the public bandit. `ResourceBudget` turns fractional limits
//! from the settings file into absolute cluster figures, yielding the
//! `p_max` memory budget the private bandit filters against.

use crate::cluster::NodeInfo;
use ro_common::quantity;
use ro_common::Error;
use ro_config::ResourceLimits;
use serde::Serialize;
use tracing::{info, warn};

/// Bytes per GiB, the unit `p_max` is expressed in.
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Default memory budget (GiB) when cluster memory figures are unavailable.
pub const DEFAULT_P_MAX_GIB: f64 = 8.0;

/// Normalised reward weights for public mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectiveWeights {
    alpha: f64,
    beta: f64,
}

impl ObjectiveWeights {
    /// Validate and normalise weights to sum to 1; both weights fall back
    /// to 0.5 when the total is zero. Negative weights fail fast.
    pub fn new(alpha: f64, beta: f64) -> Result<Self, Error> {
        if alpha < 0.0 || beta < 0.0 {
            return Err(Error::InvalidWeights(format!(
                "weights must be non-negative: alpha={alpha}, beta={beta}"
            )));
        }
        let total = alpha + beta;
        let weights = if total > 0.0 {
            ObjectiveWeights {
                alpha: alpha / total,
                beta: beta / total,
            }
        } else {
            ObjectiveWeights {
                alpha: 0.5,
                beta: 0.5,
            }
        };
        info!(alpha = weights.alpha, beta = weights.beta, "set objective weights");
        Ok(weights)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

/// Absolute resource budget derived from fractional limits and the
/// cluster's total allocatable resources.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceBudget {
    fractions: ResourceLimits,
    total_cpu_cores: Option<f64>,
    total_memory_bytes: Option<f64>,
}

impl ResourceBudget {
    /// Sum node allocatable figures and scale them by the fractions.
    pub fn from_cluster(fractions: ResourceLimits, nodes: &[NodeInfo]) -> Self {
        let mut total_cpu = 0.0;
        let mut total_memory = 0.0;
        for node in nodes {
            if let Some(cpu) = node.allocatable.get("cpu") {
                total_cpu += quantity::parse_cpu_cores(cpu).unwrap_or(0.0);
            }
            if let Some(memory) = node.allocatable.get("memory") {
                total_memory += quantity::parse_memory_bytes(memory).unwrap_or(0.0);
            }
        }
        if nodes.is_empty() {
            warn!("no nodes found in the cluster, using fractional limits only");
        }
        let budget = ResourceBudget {
            fractions,
            total_cpu_cores: (total_cpu > 0.0).then_some(total_cpu),
            total_memory_bytes: (total_memory > 0.0).then_some(total_memory),
        };
        info!(
            cpu_limit = ?budget.cpu_limit_cores(),
            memory_limit_bytes = ?budget.memory_limit_bytes(),
            "calculated absolute resource limits"
        );
        budget
    }

    /// Absolute CPU limit in cores, when cluster figures were available.
    pub fn cpu_limit_cores(&self) -> Option<f64> {
        self.total_cpu_cores.map(|t| t * self.fractions.cpu)
    }

    /// Absolute memory limit in bytes, when cluster figures were available.
    pub fn memory_limit_bytes(&self) -> Option<f64> {
        self.total_memory_bytes.map(|t| t * self.fractions.memory)
    }

    /// The hard per-iteration memory budget in GiB; defaults to
    /// [`DEFAULT_P_MAX_GIB`] when memory information is unavailable.
    pub fn p_max_gib(&self) -> f64 {
        match self.memory_limit_bytes() {
            Some(bytes) => bytes / BYTES_PER_GIB,
            None => {
                warn!(
                    default = DEFAULT_P_MAX_GIB,
                    "cluster memory unavailable, using default memory budget"
                );
                DEFAULT_P_MAX_GIB
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn node(cpu: &str, memory: &str) -> NodeInfo {
        let mut allocatable = BTreeMap::new();
        allocatable.insert("cpu".to_string(), cpu.to_string());
        allocatable.insert("memory".to_string(), memory.to_string());
        NodeInfo {
            name: "n".to_string(),
            allocatable,
            ..NodeInfo::default()
        }
    }

    #[test]
    fn weights_normalise_to_unit_sum() {
        let w = ObjectiveWeights::new(2.0, 2.0).unwrap();
        assert_eq!((w.alpha(), w.beta()), (0.5, 0.5));
        let w = ObjectiveWeights::new(3.0, 1.0).unwrap();
        assert_eq!((w.alpha(), w.beta()), (0.75, 0.25));
    }

    #[test]
    fn zero_weights_fall_back_to_even_split() {
        let w = ObjectiveWeights::new(0.0, 0.0).unwrap();
        assert_eq!((w.alpha(), w.beta()), (0.5, 0.5));
    }

    #[test]
    fn negative_weights_fail_fast() {
        assert!(ObjectiveWeights::new(-1.0, 0.5).is_err());
    }

    #[test]
    fn budget_scales_cluster_totals() {
        let nodes = vec![node("8", "16Gi"), node("4000m", "8Gi")];
        let budget = ResourceBudget::from_cluster(ResourceLimits::default(), &nodes);
        assert!((budget.cpu_limit_cores().unwrap() - 12.0 * 0.8).abs() < 1e-9);
        // 24 GiB total × 0.7 memory fraction.
        assert!((budget.p_max_gib() - 16.8).abs() < 1e-9);
    }

    #[test]
    fn missing_memory_defaults_p_max() {
        let budget = ResourceBudget::from_cluster(ResourceLimits::default(), &[]);
        assert_eq!(budget.p_max_gib(), DEFAULT_P_MAX_GIB);
        assert!(budget.memory_limit_bytes().is_none());
    }
}
