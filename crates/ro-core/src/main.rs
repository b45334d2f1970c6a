//! `ro-core` binary: bandit-driven container resource orchestration for a
//! single named workload.

use clap::Parser;
use ro_common::{Error, Mode};
use ro_config::Settings;
use ro_core::classify::KubeWorkloadClassifier;
use ro_core::cluster::{KubeApi, KubeClusterClient};
use ro_core::monitor::PrometheusMonitoring;
use ro_core::{Orchestrator, OrchestratorConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

#[derive(Parser, Debug)]
#[command(
    name = "ro-core",
    about = "Dynamic resource orchestration for containerised workloads",
    version
)]
struct Cli {
    /// Name of the application to orchestrate
    #[arg(long)]
    app_name: String,

    /// Kubernetes namespace
    #[arg(long, default_value = "default")]
    namespace: String,

    /// Orchestration mode: public or private cloud
    #[arg(long, value_enum, default_value_t = Mode::Public)]
    mode: Mode,

    /// Prometheus server URL
    #[arg(long, default_value = "http://localhost:9090")]
    prometheus_url: String,

    /// Use in-cluster Kubernetes configuration
    #[arg(long)]
    in_cluster: bool,

    /// Path to a YAML settings file
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Number of orchestration iterations to run; omit to run until stopped
    #[arg(long)]
    iterations: Option<u64>,

    /// Interval between iterations in seconds
    #[arg(long, default_value_t = 60)]
    interval: u64,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn install_signal_handlers() {
    let handler = handle_signal as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let settings = match &cli.config_file {
        Some(path) => Settings::load(path).map_err(|e| Error::Config(e.to_string()))?,
        None => Settings::default(),
    };

    let api = KubeApi::from_flags(&cli.namespace, cli.in_cluster)?;
    let cluster = Box::new(KubeClusterClient::new(api.clone()));
    let classifier = Box::new(KubeWorkloadClassifier::new(api));
    let monitoring = Box::new(PrometheusMonitoring::new(
        &cli.prometheus_url,
        &cli.app_name,
        &cli.namespace,
    ));

    let mut config = OrchestratorConfig::new(cli.app_name);
    config.namespace = cli.namespace;
    config.mode = cli.mode;
    config.iterations = cli.iterations;
    config.interval = Duration::from_secs(cli.interval);

    let mut orchestrator = Orchestrator::new(config, &settings, cluster, monitoring, classifier)?;
    orchestrator.run(&STOP)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    install_signal_handlers();
    info!(
        app = %cli.app_name,
        mode = %cli.mode,
        namespace = %cli.namespace,
        "starting resource orchestrator"
    );
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, code = e.code(), "orchestration failed");
            ExitCode::FAILURE
        }
    }
}
