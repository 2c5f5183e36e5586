//! Network device access through bastion hosts.
//!
//! Two bastion families sit behind one connector trait: traditional SSH
//! jump hosts (with primary/fallback failover and key-then-password
//! auth) and cloud CLI tunnels (preflight checks plus per-command
//! subprocess calls). On top of that, a device command runner resolves
//! per-OS command vocabulary, rotates candidate usernames until one is
//! accepted, and parses the output per OS family.

pub mod bastion;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod ports;

pub use bastion::{Bastion, connector_for};
pub use config::{Config, load_config};
pub use device::{DeviceCommandRunner, DeviceOs};
pub use error::{CliError, ConfigError, ConnectError, ExecError, PreflightError, RunnerError};
pub use ports::{BastionConnector, CommandOutput};
