//! Fleet Reservations
//!
//! Reservation engine HTTP service. Reads configuration from a TOML file
//! (~/.config/fleet-reservations/config.toml, or `FLEET_CONFIG`).

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use fleet_reservations::config::{config_path_from_env, AppConfig};
use fleet_reservations::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Debug, Parser)]
#[command(name = "fleet-reservations", version, about)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "FLEET_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (RUST_LOG still wins)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Skip database migrations on startup
    #[arg(long)]
    no_migrate: bool,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config_path_from_env);
    let loaded = AppConfig::load(&config_path);
    let mut config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => AppConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }

    init_tracing(&config.logging);
    match &loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path.display()),
        Err(e) => {
            error!("Failed to load config {}: {}", config_path.display(), e);
            if cli.check {
                return Err(e.to_string().into());
            }
        }
    }

    if cli.check {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;
    handle.install_signal_handler();

    info!("Service started. Press Ctrl+C to shut down gracefully.");
    handle.wait().await;
    Ok(())
}
