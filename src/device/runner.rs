//! Device command runner with username rotation.
//!
//! Drives one device through an already-connected bastion: resolves
//! command aliases against the per-OS vocabulary, rotates through
//! candidate usernames until one is accepted, caches the winner, and
//! dispatches output to the right parser.

use tracing::{debug, info, warn};

use crate::config::{CommandCatalog, UsernamePolicy};
use crate::device::os::DeviceOs;
use crate::device::parsers::{self, ParsedOutput};
use crate::error::{ExecError, RunnerError};
use crate::ports::bastion::{BastionConnector, CommandOutput};

/// Maximum tried usernames named in the auth failure guidance.
const GUIDANCE_SAMPLE: usize = 3;

/// Bound on raw passthrough for aliases without a dedicated parser.
const UNPARSED_LIMIT: usize = 200;

/// Build the ordered candidate username list for a device OS.
///
/// Device-specific names come first, then the global defaults, then the
/// Cisco extras for Cisco-family devices. Duplicates keep their first
/// position.
#[must_use]
pub fn candidate_usernames(os: &DeviceOs, policy: &UsernamePolicy) -> Vec<String> {
    fn push_unique(usernames: &mut Vec<String>, name: &str) {
        if !usernames.iter().any(|u| u == name) {
            usernames.push(name.to_string());
        }
    }

    let mut usernames: Vec<String> = Vec::new();
    if let Some(specific) = policy.device_specific.get(os.tag()) {
        for name in specific {
            push_unique(&mut usernames, name);
        }
    }
    for name in &policy.defaults {
        push_unique(&mut usernames, name);
    }
    if os.is_cisco_family() {
        for name in &policy.cisco_extras {
            push_unique(&mut usernames, name);
        }
    }

    usernames
}

/// The single hop command shape used for every device access.
#[must_use]
pub fn hop_command(username: &str, device_ip: &str, command: &str) -> String {
    format!("ssh -o StrictHostKeyChecking=no {username}@{device_ip} '{command}'")
}

/// An accepted attempt produced output, and that output is not a
/// device-side authorization rejection.
fn accepted(output: &CommandOutput) -> bool {
    !output.stdout.is_empty() && !output.stdout.to_lowercase().contains("permission denied")
}

pub struct DeviceCommandRunner<'a, C: BastionConnector> {
    bastion: &'a mut C,
    device_ip: String,
    os: DeviceOs,
    catalog: &'a CommandCatalog,
    usernames: Vec<String>,
    current_username: Option<String>,
    failed_usernames: Vec<String>,
}

impl<'a, C: BastionConnector> DeviceCommandRunner<'a, C> {
    /// Build a runner for one device. `override_usernames` replaces the
    /// policy-derived candidate list when the operator pins a username.
    pub fn new(
        bastion: &'a mut C,
        device_ip: String,
        os: DeviceOs,
        catalog: &'a CommandCatalog,
        policy: &UsernamePolicy,
        override_usernames: Option<Vec<String>>,
    ) -> Self {
        let usernames =
            override_usernames.unwrap_or_else(|| candidate_usernames(&os, policy));
        Self {
            bastion,
            device_ip,
            os,
            catalog,
            usernames,
            current_username: None,
            failed_usernames: Vec::new(),
        }
    }

    /// The username that last authenticated, if any.
    #[must_use]
    pub fn current_username(&self) -> Option<&str> {
        self.current_username.as_deref()
    }

    /// Run a show command by alias and parse its output.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCommand` without touching the network when the
    /// alias has no entry for this OS, `AuthExhausted` when every
    /// candidate username is rejected, and `Exec` when the bastion
    /// session itself fails.
    pub async fn run_show(&mut self, alias: &str) -> Result<ParsedOutput, RunnerError> {
        let command = self
            .catalog
            .resolve(self.os.tag(), alias)
            .ok_or_else(|| RunnerError::UnsupportedCommand {
                alias: alias.to_string(),
                os_tag: self.os.tag().to_string(),
            })?
            .to_string();

        let output = self.execute_rotating(&command).await?;

        let parsed = match alias {
            "version" => parsers::parse_show_version(&output.stdout, &self.os),
            "bgp_summary" => parsers::parse_bgp_summary(&output.stdout, &self.os),
            _ => {
                let mut cut = UNPARSED_LIMIT.min(output.stdout.len());
                while !output.stdout.is_char_boundary(cut) {
                    cut -= 1;
                }
                let mut map = ParsedOutput::new();
                map.insert(
                    parsers::RAW_OUTPUT_KEY.to_string(),
                    output.stdout[..cut].to_string(),
                );
                map
            }
        };
        Ok(parsed)
    }

    /// Run an arbitrary command with the cached username, establishing
    /// one via the `version` alias first when none is cached yet.
    ///
    /// # Errors
    ///
    /// Returns an error if no username can be established or the command
    /// itself fails.
    pub async fn run_custom(&mut self, command: &str) -> Result<CommandOutput, RunnerError> {
        if self.current_username.is_none() {
            self.run_show("version").await?;
        }
        // Rotation above either cached a username or returned an error.
        let username = self
            .current_username
            .clone()
            .ok_or(RunnerError::Exec(ExecError::NotConnected))?;

        let hop = hop_command(&username, &self.device_ip, command);
        let output = self.bastion.execute(&hop).await.map_err(RunnerError::Exec)?;
        Ok(output)
    }

    /// Try the cached username first, then every remaining candidate in
    /// order, until one attempt is accepted.
    async fn execute_rotating(&mut self, command: &str) -> Result<CommandOutput, RunnerError> {
        let mut candidates: Vec<String> = Vec::new();
        if let Some(current) = &self.current_username {
            candidates.push(current.clone());
        }
        for username in &self.usernames {
            if !candidates.contains(username) && !self.failed_usernames.contains(username) {
                candidates.push(username.clone());
            }
        }

        if candidates.is_empty() {
            return Err(self.auth_exhausted());
        }

        let total = candidates.len();
        for (index, username) in candidates.into_iter().enumerate() {
            info!(
                device = %self.device_ip,
                user = %username,
                attempt = index + 1,
                total,
                "Trying device username"
            );

            let hop = hop_command(&username, &self.device_ip, command);
            match self.bastion.execute(&hop).await {
                Ok(output) if accepted(&output) => {
                    info!(device = %self.device_ip, user = %username, "Device authentication accepted");
                    self.current_username = Some(username);
                    return Ok(output);
                }
                Ok(_) | Err(ExecError::Remote { .. }) => {
                    debug!(device = %self.device_ip, user = %username, "Username rejected");
                    self.mark_failed(username);
                }
                Err(err @ ExecError::Timeout { .. }) => {
                    // A timeout may be rate limiting rather than a dead
                    // device; the next candidate still gets its turn.
                    warn!(device = %self.device_ip, user = %username, error = %err, "Attempt timed out");
                    self.mark_failed(username);
                }
                Err(err) => return Err(RunnerError::Exec(err)),
            }
        }

        warn!(
            device = %self.device_ip,
            tried = self.failed_usernames.len(),
            "All candidate usernames rejected"
        );
        Err(self.auth_exhausted())
    }

    fn mark_failed(&mut self, username: String) {
        if self.current_username.as_deref() == Some(username.as_str()) {
            self.current_username = None;
        }
        if !self.failed_usernames.contains(&username) {
            self.failed_usernames.push(username);
        }
    }

    fn auth_exhausted(&self) -> RunnerError {
        let sample = self
            .failed_usernames
            .iter()
            .take(GUIDANCE_SAMPLE)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let guidance = format!(
            "Authentication failed. Tried {} username(s): {sample}\n\n\
             Troubleshooting steps:\n\
             1. Check device SSH config: show ip ssh\n\
             2. Check your user account exists on device\n\
             3. Verify your account has device access\n\
             4. Contact the network operations team\n\
             \nNote: This device requires specific username(s).\n\
             Device type: {}",
            self.failed_usernames.len(),
            self.os.tag()
        );
        RunnerError::AuthExhausted {
            tried: self.failed_usernames.clone(),
            os_tag: self.os.tag().to_string(),
            guidance,
        }
    }
}
