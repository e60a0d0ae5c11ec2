//! # GSE Controller
//!
//! Fill / prop relay controller. Loads one TOML file, drives the relays to
//! their boot state, then runs the actuator, telemetry and network cycles
//! until Ctrl-C, after which the relays are disarmed to the closed state.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use gse_common::prelude::{ConfigError, LogLevel, RelayOutput};
use gse_controller::config::{LoadedConfig, load_config};
use gse_controller::cycle::{Controller, ControllerIo};
use gse_controller::io::gpio::{SimulatedOutput, SysfsGpio};
use gse_controller::io::probe::{AlwaysReachable, PingProbe};
use gse_controller::io::sensors::HostSensors;
use gse_controller::io::udp::{UdpCommandReceiver, UdpTelemetrySender};
use gse_controller::io::ConnectivityProbe;
use gse_controller::state::RelayStateMachine;
use tokio::signal;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// GSE Controller: relay state management for the fill and prop boards
#[derive(Parser, Debug)]
#[command(name = "gse_controller")]
#[command(version)]
#[command(about = "Fill / prop relay controller with interlocks and auto-safing")]
struct Args {
    /// Path to controller configuration TOML.
    #[arg(default_value = "config/fill.toml")]
    config: PathBuf,

    /// Use the simulated output port and skip the ground-control probe.
    #[arg(long)]
    simulate: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let loaded = load_config(&args.config);
    let log_level = loaded
        .as_ref()
        .map(|l| l.config.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("GSE Controller v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, loaded).await {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("GSE Controller shutdown complete");
}

async fn run(
    args: &Args,
    loaded: Result<LoadedConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = loaded?;
    info!(
        "Config OK: service={}, variant={:?}, interlocks={}, redlines={}",
        loaded.config.shared.service_name,
        loaded.config.variant,
        loaded.policy.rules().len(),
        loaded.config.redlines.len(),
    );

    let output: Box<dyn RelayOutput> = if args.simulate {
        Box::new(SimulatedOutput::new())
    } else {
        Box::new(SysfsGpio::new())
    };
    let relays = RelayStateMachine::new(
        loaded.mapping.clone(),
        output,
        loaded.policy.clone(),
        loaded.safe_states,
    )?;

    if args.simulate {
        start(&loaded, relays, AlwaysReachable).await
    } else {
        let network = &loaded.config.network;
        let probe = PingProbe::new(network.ground_control.clone(), network.probe_deadline_s);
        start(&loaded, relays, probe).await
    }
}

async fn start<P: ConnectivityProbe + 'static>(
    loaded: &LoadedConfig,
    relays: RelayStateMachine,
    probe: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let network = &loaded.config.network;
    let commands = UdpCommandReceiver::bind(network.command_bind, loaded.config.variant).await?;
    let telemetry = UdpTelemetrySender::bind(network.telemetry_bind, network.telemetry_target).await?;

    let io = ControllerIo {
        commands: Box::new(commands),
        sensors: Box::new(HostSensors::new()),
        telemetry: Box::new(telemetry),
        probe,
    };
    let controller = Controller::new(loaded, relays, io);

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
            Err(err) => error!("Unable to listen for shutdown signal: {err}"),
        }
    };
    controller.run(shutdown).await;
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and `[shared] log_level`.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match log_level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
