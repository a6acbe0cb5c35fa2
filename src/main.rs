//! TankAlarm field-unit daemon.
//!
//! Remote tank-level monitoring client: samples level sensors, raises
//! debounced alarms, and relays telemetry to a base station, buffering
//! through radio outages.
//!
//! # Usage
//!
//! ```bash
//! # Run against the built-in simulated sensor bus
//! cargo run --release -- --simulate
//!
//! # Run with an explicit config file
//! cargo run --release -- --config /etc/tankalarm.toml --simulate
//! ```
//!
//! # Environment Variables
//!
//! - `TANKALARM_CONFIG`: Path to the device config TOML (default: ./tankalarm.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tankalarm::acquisition::SimulatedBus;
use tankalarm::config::{validate, DeviceConfig};
use tankalarm::outbox::Outbox;
use tankalarm::scheduler::Scheduler;
use tankalarm::transport::{LogIndicator, LogTransport, SystemTimeSource};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "tankalarm")]
#[command(about = "TankAlarm remote tank-level monitoring client")]
#[command(version)]
struct CliArgs {
    /// Path to the device config TOML. Overrides TANKALARM_CONFIG.
    #[arg(short, long, env = "TANKALARM_CONFIG")]
    config: Option<PathBuf>,

    /// Drive the pipeline from a simulated sensor bus instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Directory for the durable outbound queue
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Seed for the simulated bus (reproducible runs)
    #[arg(long, default_value = "42")]
    seed: u64,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    if !args.simulate {
        warn!("No hardware sensor bus on this build; running simulated (pass --simulate to silence this)");
    }

    let config = match &args.config {
        Some(path) => DeviceConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DeviceConfig::load(),
    };

    let report = validate(&config);
    for w in &report.warnings {
        warn!("Config warning: {w}");
    }
    if !report.is_valid() {
        anyhow::bail!("invalid config: {}", report.errors.join("; "));
    }

    info!(
        device = %config.device.id,
        site = %config.device.site,
        vessels = config.vessels.len(),
        sample_interval_secs = config.sample_interval_secs,
        "TankAlarm starting"
    );

    let outbox = Outbox::open(args.data_dir.join("outbox.dat"))
        .context("opening outbound queue")?;

    let mut bus = SimulatedBus::new(args.seed);
    for vessel in &config.vessels {
        // Start each simulated tank around half full with gentle drift
        bus.add_current_loop(vessel.channel, 50.0, 0.05);
    }

    let mut scheduler = Scheduler::new(
        config,
        outbox,
        bus,
        LogTransport::new(),
        LogIndicator,
        SystemTimeSource,
    )
    .context("starting scheduler")?;

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let start = std::time::Instant::now();
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                break;
            }
            _ = ticker.tick() => {
                scheduler.tick(start.elapsed().as_secs());
            }
        }
    }

    let stats = scheduler.stats();
    info!(
        sampling_passes = stats.sampling_passes,
        events_sent = stats.events_sent,
        telemetry_sent = stats.telemetry_sent,
        messages_queued = stats.messages_queued,
        "TankAlarm stopped"
    );
    Ok(())
}
