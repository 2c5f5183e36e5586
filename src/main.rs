use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use netbridge::cli::{
    Cli, Commands, run_bastions, run_devices, run_exec, run_shell, run_show, run_status,
};
use netbridge::config::{Config, load_config};

/// Default config location, used when `--config` is not given.
fn default_config_path() -> std::path::PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("netbridge")
        .join("config.yaml")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // An explicit --config must exist; the default path falls back to the
    // built-in catalog when absent.
    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                load_config(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
            } else {
                info!("No config file found, using built-in catalog");
                Config::default()
            }
        }
    };

    let bastion = cli.bastion.as_deref();
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Bastions => run_bastions(&config)?,
        Commands::Devices => run_devices(&config)?,
        Commands::Status => run_status(&config)?,
        Commands::Show {
            device,
            alias,
            device_user,
            json,
        } => {
            run_show(
                &config,
                bastion,
                user,
                &device,
                &alias,
                device_user.as_deref(),
                json,
            )
            .await?;
        }
        Commands::Exec {
            device,
            command,
            device_user,
        } => {
            run_exec(
                &config,
                bastion,
                user,
                &device,
                &command,
                device_user.as_deref(),
            )
            .await?;
        }
        Commands::Shell => run_shell(&config, bastion, user).await?,
    }

    Ok(())
}
