//! Reference host for the service runtime.
//!
//! Boots whatever subsystems the configuration file declares. Only the tasks
//! subsystem has a built-in manager here: a heartbeat ticker configured by
//! `[tasks] heartbeat_secs`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use service_runtime::lifecycle::signals;
use service_runtime::observability::logging::{self, LogFormat};
use service_runtime::observability::metrics;
use service_runtime::{
    BoxError, ConfigSection, FileConfigurationStore, Orchestrator, ServiceManager, Subsystems,
    TaskGroup,
};

#[derive(Parser)]
#[command(name = "service-runtime")]
#[command(about = "Run a service under the lifecycle orchestrator", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "service.toml")]
    config: PathBuf,

    /// Service identifier used as the log prefix
    #[arg(short, long, default_value = "service")]
    name: String,

    /// Start, run `on_execute`, stop and exit instead of supervising
    #[arg(long)]
    once: bool,

    /// Debug mode turns on when the DEBUG_KEY environment variable matches
    #[arg(long, default_value = "")]
    debug_key: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,

    /// Registered command token and its values, run instead of the service
    #[arg(trailing_var_arg = true)]
    invoke: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HeartbeatSettings {
    #[serde(default = "default_heartbeat_secs")]
    heartbeat_secs: u64,
}

fn default_heartbeat_secs() -> u64 {
    30
}

/// Tasks manager running a single periodic heartbeat.
#[derive(Default)]
struct HeartbeatTasks {
    interval: Duration,
    stop: CancellationToken,
}

#[async_trait]
impl ServiceManager for HeartbeatTasks {
    async fn load_from_configuration(&mut self, section: &ConfigSection) -> Result<(), BoxError> {
        let settings: HeartbeatSettings = section.deserialize()?;
        if settings.heartbeat_secs == 0 {
            return Err("tasks.heartbeat_secs must be greater than 0".into());
        }
        self.interval = Duration::from_secs(settings.heartbeat_secs);
        Ok(())
    }

    async fn start_all(&mut self, group: &TaskGroup) -> Result<(), BoxError> {
        let interval = self.interval;
        let stop = self.stop.clone();
        group.launch("heartbeat", move |token| async move {
            let mut ticker = tokio::time::interval(interval);
            let mut beats: u64 = 0;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        beats += 1;
                        tracing::info!(beats, "Heartbeat");
                    }
                }
            }
            tracing::debug!(beats, "Heartbeat stopped");
            Ok(())
        })?;
        Ok(())
    }

    async fn stop_all(&mut self) -> Result<(), BoxError> {
        self.stop.cancel();
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let mut app = Orchestrator::new(FileConfigurationStore::new(cli.config.clone())).with_subsystems(
        Subsystems::new().with_tasks(HeartbeatTasks::default()),
    );
    app.set(
        cli.name.clone(),
        "Service Runtime",
        "Reference host for the lifecycle orchestrator",
        !cli.once,
        cli.debug_key.clone(),
    );
    app.set_version(env!("CARGO_PKG_VERSION"));

    logging::init_logging(cli.log_format, app.is_debug())?;
    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr);
    }

    app.define_command("version", "version", |app, _, _| {
        println!("{} {}", app.name_id(), app.identity().version);
        Ok(())
    })?;
    app.define_option("debug", "debug-status", |app, _, _| {
        println!("debug: {}", app.is_debug());
        Ok(())
    })?;

    if app.dispatch(&cli.invoke)? {
        return Ok(());
    }

    app.on_execute(|ctx| {
        tracing::info!(presence = ?ctx.presence(), debug = ctx.is_debug(), "Service running");
        Ok(())
    });

    let _signals = signals::trigger_on_signal(app.shutdown_handle());

    tracing::info!(config = %cli.config.display(), "{} starting", app.name_id());
    app.run().await?;
    if cli.once {
        app.stop().await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
