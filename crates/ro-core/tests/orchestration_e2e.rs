//! End-to-end loop scenarios over fake cluster/monitoring backends.

use ro_common::Mode;
use ro_config::Settings;
use ro_core::classify::{AppType, WorkloadClassifier};
use ro_core::cluster::{ClusterError, ClusterMutator, NodeInfo, ResourceParameters};
use ro_core::monitor::{ContextSample, MonitoringSource, PerformanceSample, ResourceUsageSample};
use ro_core::{Orchestrator, OrchestratorConfig};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

fn node(name: &str, zone: &str, memory: &str) -> NodeInfo {
    let mut labels = BTreeMap::new();
    labels.insert("topology.kubernetes.io/zone".to_string(), zone.to_string());
    let mut allocatable = BTreeMap::new();
    allocatable.insert("cpu".to_string(), "8".to_string());
    allocatable.insert("memory".to_string(), memory.to_string());
    NodeInfo {
        name: name.to_string(),
        labels,
        allocatable,
        ..NodeInfo::default()
    }
}

struct FakeCluster {
    nodes: Vec<NodeInfo>,
    current: Option<ResourceParameters>,
    fail_apply: bool,
    applied: Rc<RefCell<Vec<ResourceParameters>>>,
}

impl FakeCluster {
    fn new(current: Option<ResourceParameters>) -> Self {
        FakeCluster {
            nodes: vec![node("n1", "a", "16Gi"), node("n2", "b", "16Gi")],
            current,
            fail_apply: false,
            applied: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl ClusterMutator for FakeCluster {
    fn get_nodes(&self) -> Result<Vec<NodeInfo>, ClusterError> {
        Ok(self.nodes.clone())
    }

    fn get_current_resources(
        &self,
        _app_name: &str,
    ) -> Result<Option<ResourceParameters>, ClusterError> {
        Ok(self.current.clone())
    }

    fn apply_resource_action(
        &self,
        _app_name: &str,
        params: &ResourceParameters,
    ) -> Result<bool, ClusterError> {
        self.applied.borrow_mut().push(params.clone());
        Ok(!self.fail_apply)
    }
}

struct FakeMonitoring {
    latency: f64,
    memory_bytes: f64,
}

impl MonitoringSource for FakeMonitoring {
    fn get_context(&self) -> ContextSample {
        ContextSample {
            workload: 100.0,
            cpu_util: 0.4,
            mem_util: 0.5,
            net_util: 0.1,
            spot_price: Some(1.0),
        }
    }

    fn get_performance_metrics(&self) -> PerformanceSample {
        PerformanceSample {
            job_time: 30.0,
            p90_latency: self.latency,
        }
    }

    fn get_resource_usage(&self) -> ResourceUsageSample {
        ResourceUsageSample {
            cpu: 1.0,
            memory: self.memory_bytes,
            network: 0.0,
        }
    }
}

struct FixedClassifier(AppType);

impl WorkloadClassifier for FixedClassifier {
    fn identify_app_type(&self, _app_name: &str) -> AppType {
        self.0
    }
}

fn fast_config(mode: Mode, iterations: u64) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::new("web");
    config.mode = mode;
    config.iterations = Some(iterations);
    config.interval = Duration::ZERO;
    config.settle = Duration::ZERO;
    config
}

fn current_spec() -> ResourceParameters {
    let mut affinities = BTreeMap::new();
    affinities.insert("a".to_string(), vec!["n1".to_string()]);
    ResourceParameters {
        cpu: 1.0,
        memory: "1024Mi".to_string(),
        replicas: 2,
        node_affinities: affinities,
    }
}

#[test]
fn public_loop_seeds_from_live_spec_and_runs_to_cap() {
    let cluster = FakeCluster::new(Some(current_spec()));
    let applied = Rc::clone(&cluster.applied);
    let mut orch = Orchestrator::new(
        fast_config(Mode::Public, 3),
        &Settings::default(),
        Box::new(cluster),
        Box::new(FakeMonitoring {
            latency: 0.2,
            memory_bytes: 2.0 * GIB,
        }),
        Box::new(FixedClassifier(AppType::Microservice)),
    )
    .unwrap();

    let stop = AtomicBool::new(false);
    orch.run(&stop).unwrap();

    let records = orch.records();
    assert_eq!(records.len(), 3);
    assert_eq!(applied.borrow().len(), 3);

    // Iteration 1 projects the live spec back into the arm space.
    let first = &records[0];
    assert_eq!(first.iteration, 1);
    assert_eq!(first.action.cpu(), 1.0);
    assert_eq!(first.action.memory_mib(), 1024.0);
    assert_eq!(first.action.replicas(), 2);
    assert_eq!(first.action.zone_split(), &[1.0, 0.0]);
    assert_eq!(first.params.node_affinities.len(), 1);

    // Microservice: performance is the negated p90 latency.
    for record in records {
        assert_eq!(record.performance, -0.2);
        assert!(record.is_safe);
        // Context carries the spot price in public mode.
        assert_eq!(record.context.dim(), 5);
    }
    assert!(orch.cumulative_regret().is_some());
}

#[test]
fn public_loop_without_live_spec_selects_from_bandit() {
    let cluster = FakeCluster::new(None);
    let mut orch = Orchestrator::new(
        fast_config(Mode::Public, 1),
        &Settings::default(),
        Box::new(cluster),
        Box::new(FakeMonitoring {
            latency: 0.1,
            memory_bytes: GIB,
        }),
        Box::new(FixedClassifier(AppType::Batch)),
    )
    .unwrap();

    let stop = AtomicBool::new(false);
    orch.run(&stop).unwrap();

    let records = orch.records();
    assert_eq!(records.len(), 1);
    // Batch workload: the job-time signal is negated instead.
    assert_eq!(records[0].performance, -30.0);
    // The arm came from the frozen set, so its split sums to its replicas.
    let split_sum: f64 = records[0].action.zone_split().iter().sum();
    assert_eq!(split_sum, f64::from(records[0].action.replicas()));
}

#[test]
fn private_loop_reports_safety_against_budget() {
    // 32 GiB allocatable × 0.7 default fraction ⇒ p_max = 22.4 GiB.
    let cluster = FakeCluster::new(Some(current_spec()));
    let mut orch = Orchestrator::new(
        fast_config(Mode::Private, 2),
        &Settings::default(),
        Box::new(cluster),
        Box::new(FakeMonitoring {
            latency: 0.2,
            memory_bytes: 2.0 * GIB,
        }),
        Box::new(FixedClassifier(AppType::Microservice)),
    )
    .unwrap();

    let stop = AtomicBool::new(false);
    orch.run(&stop).unwrap();

    let records = orch.records();
    assert_eq!(records.len(), 2);
    for record in records {
        assert!(record.is_safe);
        // No spot price in private mode.
        assert_eq!(record.context.dim(), 4);
    }
    assert!(orch.cumulative_regret().is_none());
}

#[test]
fn private_loop_flags_over_budget_usage() {
    let cluster = FakeCluster::new(None);
    let mut orch = Orchestrator::new(
        fast_config(Mode::Private, 1),
        &Settings::default(),
        Box::new(cluster),
        Box::new(FakeMonitoring {
            latency: 0.2,
            memory_bytes: 30.0 * GIB,
        }),
        Box::new(FixedClassifier(AppType::Microservice)),
    )
    .unwrap();

    let stop = AtomicBool::new(false);
    orch.run(&stop).unwrap();
    assert!(!orch.records()[0].is_safe);
}

#[test]
fn apply_failure_does_not_stop_the_loop() {
    let mut cluster = FakeCluster::new(None);
    cluster.fail_apply = true;
    let applied = Rc::clone(&cluster.applied);
    let mut orch = Orchestrator::new(
        fast_config(Mode::Public, 2),
        &Settings::default(),
        Box::new(cluster),
        Box::new(FakeMonitoring {
            latency: 0.3,
            memory_bytes: GIB,
        }),
        Box::new(FixedClassifier(AppType::Microservice)),
    )
    .unwrap();

    let stop = AtomicBool::new(false);
    orch.run(&stop).unwrap();
    assert_eq!(orch.records().len(), 2);
    assert_eq!(applied.borrow().len(), 2);
}

#[test]
fn preset_stop_flag_runs_no_iterations() {
    let cluster = FakeCluster::new(None);
    let mut orch = Orchestrator::new(
        fast_config(Mode::Public, 5),
        &Settings::default(),
        Box::new(cluster),
        Box::new(FakeMonitoring {
            latency: 0.1,
            memory_bytes: GIB,
        }),
        Box::new(FixedClassifier(AppType::Microservice)),
    )
    .unwrap();

    let stop = AtomicBool::new(true);
    orch.run(&stop).unwrap();
    assert!(orch.records().is_empty());
}
