//! Cloud CLI tunnel bastion.
//!
//! There is no persistent socket to a cloud bastion. "Connecting" runs
//! two preflight checks against the operator's workstation (CLI present,
//! identity authenticated) and every command is a fresh `gcloud compute
//! ssh` subprocess. Auth failures therefore surface as command failures,
//! not connect failures.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{BastionDescriptor, BastionEndpoint, LimitsConfig};
use crate::error::{ConnectError, ExecError, PreflightError};
use crate::ports::bastion::{BastionConnector, CommandOutput};

const DEFAULT_CLOUD_CLI: &str = "gcloud";

pub struct CloudTunnelBastion {
    descriptor: BastionDescriptor,
    limits: LimitsConfig,
    instance: String,
    zone: String,
    project: String,
    cli: String,
    connected: bool,
}

impl CloudTunnelBastion {
    /// Build a tunnel for a cloud endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor does not carry a cloud tunnel
    /// endpoint.
    pub fn new(
        descriptor: BastionDescriptor,
        limits: LimitsConfig,
    ) -> Result<Self, ConnectError> {
        let BastionEndpoint::CloudTunnel {
            instance,
            zone,
            project,
        } = &descriptor.endpoint
        else {
            return Err(ConnectError::Transport {
                host: descriptor.name.clone(),
                reason: "endpoint is not a cloud tunnel".to_string(),
            });
        };

        let instance = instance.clone();
        let zone = zone.clone();
        let project = project.clone();

        Ok(Self {
            descriptor,
            limits,
            instance,
            zone,
            project,
            cli: DEFAULT_CLOUD_CLI.to_string(),
            connected: false,
        })
    }

    /// Override the cloud CLI binary. Test hook.
    #[cfg(test)]
    fn with_cli(mut self, cli: &str) -> Self {
        self.cli = cli.to_string();
        self
    }

    /// Run one preflight subprocess under the preflight timeout, returning
    /// its stdout on success.
    async fn preflight_output(&self, args: &[&str]) -> Result<String, PreflightError> {
        let preflight_timeout = Duration::from_secs(self.limits.preflight_timeout_seconds);
        let result = timeout(
            preflight_timeout,
            Command::new(&self.cli)
                .args(args)
                .stdin(Stdio::null())
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                debug!(
                    cli = %self.cli,
                    code = ?output.status.code(),
                    "Cloud CLI preflight returned non-zero"
                );
                Err(PreflightError::MissingCli {
                    binary: self.cli.clone(),
                })
            }
            Ok(Err(e)) => {
                debug!(cli = %self.cli, error = %e, "Cloud CLI preflight failed to spawn");
                Err(PreflightError::MissingCli {
                    binary: self.cli.clone(),
                })
            }
            Err(_) => {
                warn!(cli = %self.cli, "Cloud CLI preflight timed out");
                Err(PreflightError::MissingCli {
                    binary: self.cli.clone(),
                })
            }
        }
    }

    /// Hand the terminal to an interactive session on the bastion VM. The
    /// subprocess inherits stdio; control returns when it exits.
    ///
    /// # Errors
    ///
    /// Returns an error if preflights have not passed or the CLI cannot
    /// be spawned.
    pub async fn interactive_shell(&mut self) -> Result<(), ExecError> {
        if !self.connected {
            return Err(ExecError::NotConnected);
        }

        let status = Command::new(&self.cli)
            .args(["compute", "ssh", &self.instance])
            .arg(format!("--zone={}", self.zone))
            .arg(format!("--project={}", self.project))
            .status()
            .await
            .map_err(|e| ExecError::Transport {
                reason: format!("Failed to start cloud CLI: {e}"),
            })?;

        if !status.success() {
            debug!(instance = %self.instance, code = ?status.code(), "Interactive cloud session ended with non-zero status");
        }
        Ok(())
    }
}

#[async_trait]
impl BastionConnector for CloudTunnelBastion {
    fn descriptor(&self) -> &BastionDescriptor {
        &self.descriptor
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), ConnectError> {
        if self.connected {
            return Ok(());
        }

        debug!(cli = %self.cli, "Checking cloud CLI");
        self.preflight_output(&["--version"]).await?;

        debug!(cli = %self.cli, "Checking cloud identity");
        let accounts = self
            .preflight_output(&[
                "auth",
                "list",
                "--filter=status:ACTIVE",
                "--format=value(account)",
            ])
            .await?;
        if accounts.trim().is_empty() {
            return Err(PreflightError::NotAuthenticated {
                hint: format!("{} auth login", self.cli),
            }
            .into());
        }

        info!(
            bastion = %self.descriptor.name,
            instance = %self.instance,
            zone = %self.zone,
            "Cloud bastion preflights passed"
        );
        self.connected = true;
        Ok(())
    }

    async fn execute(&mut self, command: &str) -> Result<CommandOutput, ExecError> {
        if !self.connected {
            return Err(ExecError::NotConnected);
        }

        let start = std::time::Instant::now();
        let command_timeout = Duration::from_secs(self.limits.command_timeout_seconds);

        let mut child = Command::new(&self.cli)
            .args(["compute", "ssh", &self.instance])
            .arg(format!("--zone={}", self.zone))
            .arg(format!("--project={}", self.project))
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Transport {
                reason: format!("Failed to start cloud CLI: {e}"),
            })?;

        let output = match timeout(command_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExecError::Transport {
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(ExecError::Timeout {
                    seconds: self.limits.command_timeout_seconds,
                });
            }
        };

        #[expect(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ExecError::Remote { stderr });
        }

        #[expect(clippy::cast_sign_loss)]
        let exit_code = output.status.code().unwrap_or(0) as u32;

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
            duration_ms,
        })
    }

    async fn disconnect(&mut self) {
        // Nothing persistent to tear down.
        self.connected = false;
    }
}
