//! Presenter Relay - operator console with an in-process headless display
//!
//! Runs the staging pipeline, the relay and a headless display engine in one
//! process, connected by in-process bridges. Media paths given on the command
//! line are added to the catalog; operator commands are read from stdin.
//!
//! # Usage
//!
//! ```bash
//! # Stage a show
//! presenter-relay intro.mp4 slide.png song.mp3
//!
//! # Custom config file and a background
//! presenter-relay --config ./presenter.toml --background backdrop.png
//!
//! # Serve locators through the local file server
//! presenter-relay --file-server-port 8750 intro.mp4
//!
//! # Verbose logging
//! RUST_LOG=debug presenter-relay intro.mp4
//! ```

mod console;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use presenter_core::config::{default_config_path, load_config_from_path};
use presenter_core::ConfigOverrides;

use session::Session;

/// Presenter Relay - stage media and drive a headless display from stdin
#[derive(Parser, Debug)]
#[command(name = "presenter-relay")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Media files to add to the catalog
    #[arg(value_name = "MEDIA")]
    media: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "PRESENTER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Crossfade and teardown delay in milliseconds
    #[arg(long, value_name = "MS")]
    swap_delay_ms: Option<u64>,

    /// Start with repeat enabled
    #[arg(short = 'r', long)]
    repeat: bool,

    /// Background image shown when nothing else is
    #[arg(short = 'b', long, value_name = "PATH")]
    background: Option<String>,

    /// Do not push Next-Up automatically when an item ends
    #[arg(long)]
    no_auto_advance: bool,

    /// Resolve locators through a local file server on this port
    #[arg(long, value_name = "PORT")]
    file_server_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "PRESENTER_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            swap_delay_ms: self.swap_delay_ms,
            repeat: self.repeat.then_some(true),
            background: self.background.clone(),
            auto_advance: self.no_auto_advance.then_some(false),
            file_server_port: self.file_server_port,
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new(format!(
                "presenter_relay={level},presenter_core={level}"
            ))
        })
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Presenter relay starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        source = ?config.source(),
        config_file = ?config.config_file_path,
        "Configuration loaded"
    );

    let mut session = Session::start(&config)?;
    session.add_media(args.media.iter().map(|p| p.to_string_lossy()));

    match session.run().await {
        Ok(()) => {
            info!("Presenter relay stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Presenter relay stopped with error");
            Err(e)
        }
    }
}
