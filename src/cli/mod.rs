//! Command-line interface.
//!
//! Thin argument layer over the bastion and device modules; all policy
//! lives below this.

mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use runner::{run_bastions, run_devices, run_exec, run_shell, run_show, run_status};

/// netbridge - network device access through bastion hosts
#[derive(Parser)]
#[command(name = "netbridge")]
#[command(about = "Run commands on network devices through SSH jump hosts and cloud bastions")]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # List the bastion catalog and device inventory
    netbridge bastions
    netbridge devices

    # Parsed show command on a device (rotates usernames automatically)
    netbridge show edge-router-1 version
    netbridge show edge-router-1 bgp_summary --json

    # Arbitrary command, pinning the device username
    netbridge exec edge-router-1 \"show ip route\" --device-user neteng

    # Interactive shell on a specific bastion
    netbridge shell --bastion gcp-us-central

The jump host password is read from the NETBRIDGE_PASSWORD environment
variable; SSH keys in ~/.ssh are tried first when present.")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Bastion id from the catalog (defaults to the configured default)
    #[arg(short, long, global = true)]
    pub bastion: Option<String>,

    /// Login username for the bastion itself (defaults to $USER)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the bastion catalog
    Bastions,

    /// List the device inventory
    Devices,

    /// Show configuration, limits, and catalog summary
    Status,

    /// Run a show command by alias and print parsed output
    Show {
        /// Device name from the inventory
        device: String,

        /// Command alias (version, bgp_summary, ...)
        #[arg(default_value = "version")]
        alias: String,

        /// Pin the device username instead of rotating candidates
        #[arg(long)]
        device_user: Option<String>,

        /// Emit parsed output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run an arbitrary command on a device and print the raw output
    Exec {
        /// Device name from the inventory
        device: String,

        /// Command to execute
        command: String,

        /// Pin the device username instead of rotating candidates
        #[arg(long)]
        device_user: Option<String>,
    },

    /// Open an interactive shell on the bastion host
    Shell,
}
