//! Per-iteration orchestration control loop.
//!
//! Each iteration: fetch context, pick an arm (iteration 1 seeds the GP
//! with the live status-quo spec), project it onto cluster parameters,
//! apply, wait for the cluster to settle, observe performance and resource
//! usage, and feed the outcome back into the bandit.
//!
//! The loop is single-threaded and cooperative: the settling wait and the
//! inter-iteration interval are the only long suspensions, both chunked
//! against a caller-supplied stop flag so a signal aborts them promptly.

use crate::action_space::ActionSpace;
use crate::classify::{AppType, WorkloadClassifier};
use crate::cluster::{ClusterMutator, ResourceParameters};
use crate::decision::{Bandit, BanditError, PrivateCloudBandit, PublicCloudBandit};
use crate::enforce::{ObjectiveWeights, ResourceBudget, BYTES_PER_GIB};
use crate::monitor::MonitoringSource;
use chrono::{DateTime, Utc};
use ro_common::{Arm, Context, Error, Mode};
use ro_config::Settings;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Hourly cost per CPU core.
const CPU_COST_PER_CORE: f64 = 0.0425;
/// Hourly cost per GiB of memory.
const MEMORY_COST_PER_GIB: f64 = 0.00575;

/// Construction-time configuration for the loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub app_name: String,
    pub namespace: String,
    pub mode: Mode,
    /// Iteration cap; `None` runs until stopped.
    pub iterations: Option<u64>,
    /// Inter-iteration interval.
    pub interval: Duration,
    /// Settling wait between applying an action and measuring its effect.
    pub settle: Duration,
}

impl OrchestratorConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        OrchestratorConfig {
            app_name: app_name.into(),
            namespace: "default".to_string(),
            mode: Mode::Public,
            iterations: None,
            interval: Duration::from_secs(60),
            settle: Duration::from_secs(30),
        }
    }
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub iteration: u64,
    pub started_at: DateTime<Utc>,
    pub action: Arm,
    pub params: ResourceParameters,
    pub context: Context,
    pub performance: f64,
    pub cost: f64,
    pub reward: f64,
    pub is_safe: bool,
}

/// The orchestration controller.
pub struct Orchestrator {
    config: OrchestratorConfig,
    cluster: Box<dyn ClusterMutator>,
    monitoring: Box<dyn MonitoringSource>,
    classifier: Box<dyn WorkloadClassifier>,
    space: ActionSpace,
    bandit: Bandit,
    iteration: u64,
    records: Vec<IterationRecord>,
}

impl Orchestrator {
    /// Wire up the loop: discover the cluster, freeze the action space,
    /// and build the mode-appropriate bandit from the settings.
    pub fn new(
        config: OrchestratorConfig,
        settings: &Settings,
        cluster: Box<dyn ClusterMutator>,
        monitoring: Box<dyn MonitoringSource>,
        classifier: Box<dyn WorkloadClassifier>,
    ) -> Result<Self, Error> {
        let nodes = cluster.get_nodes()?;
        let mut rng = rand::rng();
        let space = ActionSpace::build(&nodes, &mut rng);

        let bandit = match config.mode {
            Mode::Public => {
                let (alpha, beta) = settings.reward_weights();
                let weights = ObjectiveWeights::new(alpha, beta)?;
                Bandit::Public(PublicCloudBandit::new(
                    space.arms().to_vec(),
                    weights.alpha(),
                    weights.beta(),
                )?)
            }
            Mode::Private => {
                let budget = ResourceBudget::from_cluster(settings.limits_or_default(), &nodes);
                let p_max = budget.p_max_gib();
                let seed_size = space.arms().len().div_ceil(10).max(1);
                let seed = space.arms()[..seed_size].to_vec();
                Bandit::Private(PrivateCloudBandit::new(
                    space.arms().to_vec(),
                    p_max,
                    Some(seed),
                )?)
            }
        };

        Ok(Orchestrator {
            config,
            cluster,
            monitoring,
            classifier,
            space,
            bandit,
            iteration: 0,
            records: Vec::new(),
        })
    }

    /// Run until the iteration cap, the stop flag, or an escaping error.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), Error> {
        self.iteration = 0;
        info!(
            app = %self.config.app_name,
            mode = %self.config.mode,
            "starting orchestrator"
        );
        while !stop.load(Ordering::Relaxed) {
            match self.orchestrate_once(stop) {
                Ok(record) => self.records.push(record),
                Err(e) => {
                    error!(error = %e, code = e.code(), "error in orchestration");
                    return Err(e);
                }
            }
            if let Some(cap) = self.config.iterations {
                if self.iteration >= cap {
                    info!(iterations = cap, "completed requested iterations, stopping");
                    break;
                }
            }
            if stop.load(Ordering::Relaxed) {
                break;
            }
            debug!(
                secs = self.config.interval.as_secs(),
                "waiting until next iteration"
            );
            interruptible_sleep(self.config.interval, stop);
        }
        if let Bandit::Public(bandit) = &self.bandit {
            info!(regret = bandit.cumulative_regret(), "cumulative regret");
        }
        info!("orchestrator stopped");
        Ok(())
    }

    /// One full iteration of the control loop.
    fn orchestrate_once(&mut self, stop: &AtomicBool) -> Result<IterationRecord, Error> {
        self.iteration += 1;
        let started_at = Utc::now();
        info!(iteration = self.iteration, "starting orchestration iteration");

        let context = self.fetch_context();
        debug!(context = ?context.as_slice(), "current context");

        let action = if self.iteration == 1 {
            match self.cluster.get_current_resources(&self.config.app_name) {
                Ok(Some(current)) => {
                    info!(params = ?current, "using current configuration for first iteration");
                    self.space.arm_from_parameters(&current)
                }
                Ok(None) => {
                    info!("no current configuration found, selecting new action");
                    self.select_action(&context)?
                }
                Err(e) => {
                    warn!(error = %e, "failed to read current resources, selecting new action");
                    self.select_action(&context)?
                }
            }
        } else {
            self.select_action(&context)?
        };

        let params = self.space.parameters_for(&action);
        info!(iteration = self.iteration, params = ?params, "selected resource parameters");

        match self
            .cluster
            .apply_resource_action(&self.config.app_name, &params)
        {
            Ok(true) => {}
            Ok(false) => warn!("failed to apply resource action"),
            Err(e) => warn!(error = %e, "failed to apply resource action"),
        }

        interruptible_sleep(self.config.settle, stop);

        let perf_metrics = self.monitoring.get_performance_metrics();
        let usage = self.monitoring.get_resource_usage();
        let app_type = self.classifier.identify_app_type(&self.config.app_name);
        // Higher is better everywhere downstream, so negate the signal.
        let performance = match app_type {
            AppType::Microservice => -perf_metrics.p90_latency,
            AppType::Batch => -perf_metrics.job_time,
        };

        let cost = action_cost(&action, &context, self.config.mode);

        let (reward, is_safe) = match &mut self.bandit {
            Bandit::Public(bandit) => {
                let reward = bandit.update(action.clone(), context.clone(), performance, cost)?;
                (reward, true)
            }
            Bandit::Private(bandit) => {
                let resource_gib = usage.memory / BYTES_PER_GIB;
                let (perf, is_safe) =
                    bandit.update(action.clone(), context.clone(), performance, resource_gib)?;
                (perf, is_safe)
            }
        };

        info!(
            iteration = self.iteration,
            performance, cost, reward, is_safe, "iteration complete"
        );
        Ok(IterationRecord {
            iteration: self.iteration,
            started_at,
            action,
            params,
            context,
            performance,
            cost,
            reward,
            is_safe,
        })
    }

    fn select_action(&mut self, context: &Context) -> Result<Arm, BanditError> {
        match &mut self.bandit {
            Bandit::Public(bandit) => bandit.select_action(context),
            Bandit::Private(bandit) => bandit.select_action(context),
        }
    }

    /// Assemble the context vector with the fixed dimension ordering.
    fn fetch_context(&self) -> Context {
        let sample = self.monitoring.get_context();
        let mut components = vec![
            sample.workload,
            sample.cpu_util,
            sample.mem_util,
            sample.net_util,
        ];
        if self.config.mode == Mode::Public {
            if let Some(spot) = sample.spot_price {
                components.push(spot);
            }
        }
        Context::new(components)
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.space
    }

    pub fn bandit(&self) -> &Bandit {
        &self.bandit
    }

    /// Cumulative regret so far; public mode only.
    pub fn cumulative_regret(&self) -> Option<f64> {
        match &self.bandit {
            Bandit::Public(bandit) => Some(bandit.cumulative_regret()),
            Bandit::Private(_) => None,
        }
    }
}

/// Monetary cost of running an arm: per-replica core and memory prices,
/// scaled by the spot price when the context carries one (public mode).
pub fn action_cost(action: &Arm, context: &Context, mode: Mode) -> f64 {
    let cpu_cost = action.cpu() * CPU_COST_PER_CORE;
    let memory_cost = (action.memory_mib() / 1024.0) * MEMORY_COST_PER_GIB;
    let mut cost = (cpu_cost + memory_cost) * f64::from(action.replicas());
    if mode == Mode::Public {
        if let Some(spot) = context.spot_price() {
            cost *= spot;
        }
    }
    cost
}

/// Sleep in short chunks so the stop flag aborts promptly.
fn interruptible_sleep(total: Duration, stop: &AtomicBool) {
    const CHUNK: Duration = Duration::from_millis(250);
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
        let step = remaining.min(CHUNK);
        std::thread::sleep(step);
        remaining -= step;
    }
}
