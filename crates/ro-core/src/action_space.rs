//! Arm-set construction and arm ↔ cluster-parameter projection.
//!
//! The arm set is frozen at construction: a random sample of candidate
//! configurations over a CPU grid, a memory ladder, a replica range, and a
//! random replica split across the discovered placement zones.

use crate::cluster::{NodeInfo, ResourceParameters};
use rand::Rng;
use ro_common::quantity;
use ro_common::types::ZONE_OFFSET;
use ro_common::Arm;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Candidate CPU grid: 10 points from 0.1 to 4.0 cores.
const CPU_STEPS: usize = 10;
const CPU_MIN: f64 = 0.1;
const CPU_MAX: f64 = 4.0;

/// Candidate memory ladder in MiB.
const MEMORY_VALUES: [f64; 7] = [128.0, 256.0, 512.0, 1024.0, 2048.0, 4096.0, 8192.0];

/// Candidate replica counts.
const REPLICA_VALUES: [u32; 5] = [1, 2, 3, 4, 5];

/// Arms sampled into the frozen set.
const NUM_ACTIONS: usize = 100;

/// Fallback memory (MiB) when a live spec string is unrecognisable.
const FALLBACK_MEMORY_MIB: f64 = 512.0;

/// One placement zone and the nodes backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    pub name: String,
    pub nodes: Vec<String>,
}

/// Frozen arm set plus the zone layout arms are expressed against.
#[derive(Debug, Clone, Serialize)]
pub struct ActionSpace {
    arms: Vec<Arm>,
    zones: Vec<Zone>,
}

impl ActionSpace {
    /// Discover zones from node labels and sample the arm set.
    ///
    /// Nodes group by their `topology.kubernetes.io/zone` label (a bare
    /// `zone` label is honoured too); when no node carries one, a single
    /// synthetic `zone-1` holds every node.
    pub fn build(nodes: &[NodeInfo], rng: &mut impl Rng) -> Self {
        let zones = discover_zones(nodes);
        let arms = sample_arms(zones.len(), NUM_ACTIONS, rng);
        info!(
            actions = arms.len(),
            dimensions = arms.first().map_or(0, Arm::dim),
            zones = zones.len(),
            "built action space"
        );
        ActionSpace { arms, zones }
    }

    /// Build over explicit zones and arms; used by tests and callers that
    /// already know the layout.
    pub fn from_parts(zones: Vec<Zone>, arms: Vec<Arm>) -> Self {
        ActionSpace { arms, zones }
    }

    pub fn arms(&self) -> &[Arm] {
        &self.arms
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Arm dimension: cpu, memory, replicas, plus one component per zone.
    pub fn arm_dim(&self) -> usize {
        ZONE_OFFSET + self.zones.len()
    }

    /// Project an arm onto concrete cluster parameters.
    ///
    /// Every zone with a positive replica share receives the full node
    /// list of that zone as a preferred affinity.
    pub fn parameters_for(&self, arm: &Arm) -> ResourceParameters {
        let mut node_affinities = BTreeMap::new();
        for (zone, share) in self.zones.iter().zip(arm.zone_split()) {
            if *share > 0.0 {
                node_affinities.insert(zone.name.clone(), zone.nodes.clone());
            }
        }
        ResourceParameters {
            cpu: arm.cpu(),
            memory: quantity::format_memory_mib(arm.memory_mib()),
            replicas: arm.replicas(),
            node_affinities,
        }
    }

    /// Project live cluster parameters back into the arm space.
    ///
    /// Unrecognised memory strings fall back to 512 MiB. Each zone named
    /// in the affinities is marked with a 1 — a presence flag, not a
    /// replica count, so this inverse does not generally satisfy the
    /// replica-sum property of sampled arms.
    pub fn arm_from_parameters(&self, params: &ResourceParameters) -> Arm {
        let memory = quantity::parse_memory_mib(&params.memory).unwrap_or(FALLBACK_MEMORY_MIB);
        let mut components = Vec::with_capacity(self.arm_dim());
        components.push(params.cpu);
        components.push(memory);
        components.push(f64::from(params.replicas));
        for zone in &self.zones {
            components.push(if params.node_affinities.contains_key(&zone.name) {
                1.0
            } else {
                0.0
            });
        }
        Arm::new(components)
    }
}

fn discover_zones(nodes: &[NodeInfo]) -> Vec<Zone> {
    let mut by_zone: Vec<Zone> = Vec::new();
    for node in nodes {
        let label = node
            .labels
            .get("topology.kubernetes.io/zone")
            .or_else(|| node.labels.get("zone"));
        if let Some(zone_name) = label {
            match by_zone.iter_mut().find(|z| z.name == *zone_name) {
                Some(zone) => zone.nodes.push(node.name.clone()),
                None => by_zone.push(Zone {
                    name: zone_name.clone(),
                    nodes: vec![node.name.clone()],
                }),
            }
        }
    }
    if by_zone.is_empty() {
        by_zone.push(Zone {
            name: "zone-1".to_string(),
            nodes: nodes.iter().map(|n| n.name.clone()).collect(),
        });
    }
    by_zone
}

fn sample_arms(num_zones: usize, count: usize, rng: &mut impl Rng) -> Vec<Arm> {
    let cpu_step = (CPU_MAX - CPU_MIN) / (CPU_STEPS - 1) as f64;
    (0..count)
        .map(|_| {
            let cpu = CPU_MIN + cpu_step * rng.random_range(0..CPU_STEPS) as f64;
            let memory = MEMORY_VALUES[rng.random_range(0..MEMORY_VALUES.len())];
            let replicas = REPLICA_VALUES[rng.random_range(0..REPLICA_VALUES.len())];
            let split = split_replicas(replicas, num_zones, rng);
            let mut components = Vec::with_capacity(ZONE_OFFSET + num_zones);
            components.push(cpu);
            components.push(memory);
            components.push(f64::from(replicas));
            components.extend(split);
            Arm::new(components)
        })
        .collect()
}

/// Split a replica count across zones by random proportions: floor shares
/// for the first Z−1 zones, remainder to the last. Components are
/// non-negative integers summing to the count.
fn split_replicas(replicas: u32, num_zones: usize, rng: &mut impl Rng) -> Vec<f64> {
    if num_zones <= 1 {
        return vec![f64::from(replicas)];
    }
    let mut probs: Vec<f64> = (0..num_zones).map(|_| rng.random::<f64>()).collect();
    let total: f64 = probs.iter().sum();
    for p in &mut probs {
        *p /= total;
    }
    let mut split = vec![0.0; num_zones];
    let mut remaining = replicas;
    for i in 0..num_zones - 1 {
        let share = (probs[i] * f64::from(replicas)).floor().min(f64::from(remaining)) as u32;
        split[i] = f64::from(share);
        remaining -= share;
    }
    split[num_zones - 1] = f64::from(remaining);
    split
}
