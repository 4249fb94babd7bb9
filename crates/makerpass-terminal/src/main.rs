//! MakerPass terminal binary.
//!
//! Loads the configuration, connects to the authority and runs the control
//! loop against the console peripherals: relay, display and indicator changes
//! are logged, and card codes are read from stdin one per line.
//!
//! # Usage
//!
//! ```text
//! makerpass-terminal --config /etc/makerpass.toml
//! RUST_LOG=debug makerpass-terminal --url ws://127.0.0.1:8080/ws
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use makerpass_controller::DeviceIdentity;
use makerpass_core::Config;
use makerpass_hardware::console::{LineCardReader, LogDisplay, LogIndicator, LogRelay};
use makerpass_network::{TransportCommand, TransportConfig, TransportHandle, spawn_transport};
use makerpass_terminal::{Peripherals, Runtime};
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// MakerPass RFID access terminal.
#[derive(Debug, Parser)]
#[command(
    name = "makerpass-terminal",
    about = "MakerPass RFID access terminal for doors and machines",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "makerpass.toml", env = "MAKERPASS_CONFIG")]
    config: PathBuf,

    /// Authority WebSocket URL, overriding `[authority] url` in the file.
    #[arg(long, env = "MAKERPASS_URL")]
    url: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;

        if let Some(url) = &self.url {
            config.authority.url = url.clone();
        }

        config
            .validate()
            .with_context(|| format!("invalid config in {}", self.config.display()))?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    if cli.check {
        println!("{}: ok", cli.config.display());
        return Ok(());
    }

    info!(
        resource_id = %config.device.resource_id,
        device_type = %config.device.device_type,
        authority = %config.authority.url,
        version = makerpass_core::VERSION,
        "MakerPass terminal starting"
    );

    let (transport, transport_task) = spawn_transport(TransportConfig {
        url: config.authority.url.clone(),
        reconnect_interval: config.authority.reconnect_interval(),
        connect_timeout: config.authority.connect_timeout(),
    });
    let (commands, events) = transport.into_parts();

    let peripherals = Peripherals {
        relay: LogRelay::new(),
        display: LogDisplay,
        indicator: LogIndicator,
        reader: LineCardReader::new(BufReader::new(tokio::io::stdin())),
    };
    let mut runtime = Runtime::new(
        DeviceIdentity::from(&config.device),
        &config.timing,
        peripherals,
    );

    tokio::select! {
        () = runtime.run(TransportHandle::new(commands.clone(), events)) => {
            warn!("Transport stopped unexpectedly");
        }
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl+C: {e}"),
        },
    }

    runtime.shutdown().await;

    // The transport may already be gone
    let _ = commands.send(TransportCommand::Shutdown).await;
    if let Err(e) = transport_task.await {
        error!("Transport task failed: {e}");
    }

    info!("MakerPass terminal stopped");

    // A pending blocking read on stdin would hold up runtime shutdown
    std::process::exit(0)
}
