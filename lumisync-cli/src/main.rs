//! Command-line frontend: runs one sync mode until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lumisync_core::capture::SystemCaptureBackend;
use lumisync_core::config::{env_device_ip, load_settings_or_default, Credentials};
use lumisync_core::device::{SubnetScanner, TapoController};
use lumisync_core::engines::{SyncCoordinator, SyncMode};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "lumisync")]
#[command(about = "Sync a Tapo color bulb to live audio or screen content", long_about = None)]
struct Cli {
    /// YAML settings file (defaults apply when omitted)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Device IP address (falls back to TAPO_IP, then to a subnet scan
    /// for screen mode)
    #[arg(long, value_name = "IP")]
    ip: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive the light from audio spectral energy
    Audio,
    /// Drive the light from the dominant screen color
    Screen {
        /// Initial brightness ceiling (1-100)
        #[arg(long, value_name = "PERCENT")]
        brightness: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let credentials = Credentials::from_env()
        .context("Tapo credentials are required (TAPO_EMAIL / TAPO_PASSWORD)")?;
    let settings = load_settings_or_default(cli.settings.as_deref())
        .context("failed to load settings")?;
    let device_ip = cli.ip.or_else(env_device_ip);

    let session = Arc::new(TapoController::new(
        &credentials.email,
        &credentials.password,
    ));
    let discovery = Arc::new(SubnetScanner::new(
        &credentials.email,
        &credentials.password,
    ));

    let mut coordinator = SyncCoordinator::new(session, discovery, Arc::new(SystemCaptureBackend));

    let (mode, brightness) = match cli.command {
        Command::Audio => (SyncMode::Audio, None),
        Command::Screen { brightness } => (SyncMode::Screen, brightness),
    };

    coordinator
        .start(
            mode,
            device_ip.as_deref(),
            settings.audio,
            settings.screen,
            brightness,
        )
        .await
        .with_context(|| format!("failed to start {mode} sync"))?;

    tracing::info!("Running in {} mode, press Ctrl-C to stop", mode);
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    coordinator.stop().await;

    Ok(())
}
