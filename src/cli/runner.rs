//! CLI runner functions
//!
//! Each function maps one subcommand onto the bastion and device layers
//! and prints for a human (or `--json` for scripts).

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::bastion::{Bastion, connector_for};
use crate::config::{BastionEndpoint, Config};
use crate::device::parsers::format_output;
use crate::device::{DeviceCommandRunner, DeviceOs};
use crate::error::CliError;
use crate::ports::bastion::BastionConnector;
use crate::ports::lookup::{DeviceLookup, DeviceRecord, StaticDeviceLookup};

/// Environment variable holding the jump host password.
pub const PASSWORD_ENV: &str = "NETBRIDGE_PASSWORD";

fn login_user(cli_user: Option<&str>) -> String {
    cli_user
        .map(String::from)
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "operator".to_string())
}

fn bastion_password() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV).ok().map(Zeroizing::new)
}

fn resolve_device(config: &Config, name: &str) -> Result<DeviceRecord, CliError> {
    let lookup = StaticDeviceLookup::new(config.devices.clone());
    lookup.find(name).ok_or_else(|| CliError::UnknownDevice {
        name: name.to_string(),
    })
}

/// Build and connect the selected bastion.
async fn connect_bastion(
    config: &Config,
    bastion_id: Option<&str>,
    user: Option<&str>,
) -> Result<Bastion, CliError> {
    let id = bastion_id.unwrap_or(&config.default_bastion);
    let descriptor = config
        .bastion(id)
        .ok_or_else(|| CliError::UnknownBastion { id: id.to_string() })?
        .clone();

    info!(bastion = %id, kind = descriptor.kind(), "Selecting bastion");

    let mut bastion = connector_for(
        descriptor,
        config.limits.clone(),
        login_user(user),
        bastion_password(),
    )?;
    bastion.connect().await?;
    Ok(bastion)
}

/// List the bastion catalog.
///
/// # Errors
///
/// Infallible in practice; returns `Result` for consistency with the
/// other CLI commands.
pub fn run_bastions(config: &Config) -> Result<(), CliError> {
    println!("Bastion Catalog ({}):", config.bastions.len());
    println!("{:-<60}", "");

    let mut ids: Vec<&String> = config.bastions.keys().collect();
    ids.sort_unstable();

    for id in ids {
        let descriptor = &config.bastions[id];
        let default_marker = if *id == config.default_bastion {
            " (default)"
        } else {
            ""
        };
        println!("\n  {id}{default_marker}:");
        println!("    Name: {}", descriptor.name);
        println!("    Type: {}", descriptor.kind());
        if !descriptor.region.is_empty() {
            println!("    Region: {}", descriptor.region);
        }
        match &descriptor.endpoint {
            BastionEndpoint::SshJump {
                host,
                fallback_host,
                port,
            } => {
                println!("    Host: {host}:{port}");
                if let Some(fallback) = fallback_host {
                    println!("    Fallback: {fallback}:{port}");
                }
            }
            BastionEndpoint::CloudTunnel {
                instance,
                zone,
                project,
            } => {
                println!("    Instance: {instance}");
                println!("    Zone: {zone}");
                println!("    Project: {project}");
            }
        }
        if !descriptor.description.is_empty() {
            println!("    Description: {}", descriptor.description);
        }
    }

    Ok(())
}

/// List the device inventory.
///
/// # Errors
///
/// Infallible in practice.
pub fn run_devices(config: &Config) -> Result<(), CliError> {
    let lookup = StaticDeviceLookup::new(config.devices.clone());
    let names = lookup.names();

    println!("Device Inventory ({}):", names.len());
    println!("{:-<60}", "");

    if names.is_empty() {
        println!("  (no devices configured)");
        return Ok(());
    }

    for name in names {
        if let Some(record) = lookup.find(&name) {
            let address = record
                .management_ip
                .as_deref()
                .unwrap_or("(no management address)");
            println!(
                "  {name:24} {address:18} {:14} {}",
                record.os.tag(),
                record.state
            );
        }
    }

    Ok(())
}

/// Show configuration summary.
///
/// # Errors
///
/// Infallible in practice.
pub fn run_status(config: &Config) -> Result<(), CliError> {
    println!("netbridge Status");
    println!("================\n");

    println!("Default bastion: {}", config.default_bastion);
    println!("Bastions: {}", config.bastions.len());
    println!("Devices: {}", config.devices.len());

    println!("\nLimits:");
    println!(
        "  Connect timeout: {}s",
        config.limits.connect_timeout_seconds
    );
    println!(
        "  Command timeout: {}s",
        config.limits.command_timeout_seconds
    );
    println!(
        "  Preflight timeout: {}s",
        config.limits.preflight_timeout_seconds
    );
    println!("  Max output: {} bytes", config.limits.max_output_bytes);

    println!("\nUsername policy:");
    println!("  Defaults: {}", config.usernames.defaults.len());
    let mut tags: Vec<&String> = config.usernames.device_specific.keys().collect();
    tags.sort_unstable();
    for tag in tags {
        println!(
            "  {tag}: {} device-specific",
            config.usernames.device_specific[tag].len()
        );
    }
    println!("  Cisco extras: {}", config.usernames.cisco_extras.len());

    println!("\nCommand aliases:");
    let mut tags: Vec<&String> = config.commands.show_commands.keys().collect();
    tags.sort_unstable();
    for tag in tags {
        println!("  {tag}: {}", config.commands.aliases(tag).join(", "));
    }

    Ok(())
}

/// Run a show command by alias and print parsed output.
///
/// # Errors
///
/// Returns an error if the device or bastion is unknown, the device has
/// no management address, the bastion cannot be reached, or every
/// candidate username is rejected.
pub async fn run_show(
    config: &Config,
    bastion_id: Option<&str>,
    user: Option<&str>,
    device: &str,
    alias: &str,
    device_user: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let record = resolve_device(config, device)?;
    let device_ip = record
        .management_ip
        .clone()
        .ok_or_else(|| CliError::DeviceUnreachable {
            name: device.to_string(),
        })?;

    let mut bastion = connect_bastion(config, bastion_id, user).await?;
    let result = show_on(config, &mut bastion, &device_ip, record.os, alias, device_user, json).await;
    bastion.disconnect().await;
    result
}

async fn show_on(
    config: &Config,
    bastion: &mut Bastion,
    device_ip: &str,
    os: DeviceOs,
    alias: &str,
    device_user: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let mut runner = DeviceCommandRunner::new(
        bastion,
        device_ip.to_string(),
        os,
        &config.commands,
        &config.usernames,
        device_user.map(|u| vec![u.to_string()]),
    );

    let parsed = runner.run_show(alias).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        if let Some(username) = runner.current_username() {
            println!("Authenticated as: {username}\n");
        }
        println!("{}", format_output(&parsed));
    }
    Ok(())
}

/// Run an arbitrary command on a device and print the raw output.
///
/// # Errors
///
/// Same failure surface as [`run_show`].
pub async fn run_exec(
    config: &Config,
    bastion_id: Option<&str>,
    user: Option<&str>,
    device: &str,
    command: &str,
    device_user: Option<&str>,
) -> Result<(), CliError> {
    let record = resolve_device(config, device)?;
    let device_ip = record
        .management_ip
        .clone()
        .ok_or_else(|| CliError::DeviceUnreachable {
            name: device.to_string(),
        })?;

    let mut bastion = connect_bastion(config, bastion_id, user).await?;
    let result = exec_on(config, &mut bastion, &device_ip, record.os, command, device_user).await;
    bastion.disconnect().await;
    result
}

async fn exec_on(
    config: &Config,
    bastion: &mut Bastion,
    device_ip: &str,
    os: DeviceOs,
    command: &str,
    device_user: Option<&str>,
) -> Result<(), CliError> {
    let mut runner = DeviceCommandRunner::new(
        bastion,
        device_ip.to_string(),
        os,
        &config.commands,
        &config.usernames,
        device_user.map(|u| vec![u.to_string()]),
    );

    let output = runner.run_custom(command).await?;
    if output.exit_code != 0 {
        warn!(
            device = %device_ip,
            exit_code = output.exit_code,
            "Command returned non-zero exit status"
        );
    }
    println!("{}", output.stdout);
    Ok(())
}

/// Open an interactive shell on the bastion host.
///
/// # Errors
///
/// Returns an error if the bastion is unknown or unreachable, or the
/// relay breaks mid-session.
pub async fn run_shell(
    config: &Config,
    bastion_id: Option<&str>,
    user: Option<&str>,
) -> Result<(), CliError> {
    let mut bastion = connect_bastion(config, bastion_id, user).await?;
    let result = bastion.interactive_shell().await;
    bastion.disconnect().await;
    result?;
    Ok(())
}
