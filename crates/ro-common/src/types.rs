//! Arm and context vectors for the bandit input space.
//!
//! An arm is one candidate resource configuration, laid out as
//! `[cpu_cores, memory_mib, replica_count, replicas_in_zone_1..Z]`.
//! A context is the observable environment sampled fresh each iteration.
//! Both are plain real vectors; the GP consumes their concatenation.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Operating mode of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Maximise a weighted performance/cost scalar.
    Public,
    /// Maximise performance under a hard resource budget with safe exploration.
    Private,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Public => write!(f, "public"),
            Mode::Private => write!(f, "private"),
        }
    }
}

/// One candidate resource configuration vector.
///
/// Layout: `[cpu_cores, memory_mib, replica_count, z_1, ..., z_Z]` where the
/// per-zone components are non-negative integers summing to the replica
/// count. Arms are immutable once the arm set is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arm(pub Vec<f64>);

/// Offset of the first per-zone component in an arm vector.
pub const ZONE_OFFSET: usize = 3;

impl Arm {
    pub fn new(components: Vec<f64>) -> Self {
        Arm(components)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Requested CPU cores.
    pub fn cpu(&self) -> f64 {
        self.0[0]
    }

    /// Requested memory in MiB.
    pub fn memory_mib(&self) -> f64 {
        self.0[1]
    }

    /// Requested replica count.
    pub fn replicas(&self) -> u32 {
        self.0[2] as u32
    }

    /// Per-zone replica split, one entry per placement zone.
    pub fn zone_split(&self) -> &[f64] {
        &self.0[ZONE_OFFSET..]
    }
}

/// Current observable environment, fed alongside arms to the GP input.
///
/// Ordering is fixed: `[workload, cpu_util, mem_util, net_util]` plus
/// `spot_price` as a fifth component in public mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context(pub Vec<f64>);

impl Context {
    pub fn new(components: Vec<f64>) -> Self {
        Context(components)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Spot price, when the context carries one (public mode).
    pub fn spot_price(&self) -> Option<f64> {
        self.0.get(4).copied()
    }
}

/// Concatenate an arm and a context into a single GP input row.
pub fn concat_input(arm: &Arm, context: &Context) -> Vec<f64> {
    let mut x = Vec::with_capacity(arm.dim() + context.dim());
    x.extend_from_slice(arm.as_slice());
    x.extend_from_slice(context.as_slice());
    x
}
