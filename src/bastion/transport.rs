//! russh-backed jump host transport.
//!
//! Implements the dialer port on top of russh: one `dial` call resolves
//! the host, opens the TCP+SSH transport under the connect timeout, and
//! performs exactly one authentication attempt. Host/auth ordering lives
//! in `bastion::jumpbox`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::ChannelMsg;
use russh::client::{self, Config, Handle, Handler};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::{PublicKey, load_secret_key};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::lookup_host;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::{ConnectError, ExecError};
use crate::ports::bastion::CommandOutput;
use crate::ports::dialer::{JumpAuth, JumpConnection, JumpDialer};

/// Key filenames probed under `~/.ssh`, in preference order.
const KEY_CANDIDATES: [&str; 4] = ["id_rsa", "id_ecdsa", "id_ed25519", "id_dsa"];

/// Discover usable private keys in the operator's `~/.ssh` directory.
///
/// A candidate counts only if the file exists and actually contains PEM
/// private key material; stray empty files and public halves are skipped.
#[must_use]
pub fn discover_private_keys() -> Vec<PathBuf> {
    let ssh_dir = shellexpand::tilde("~/.ssh").into_owned();
    KEY_CANDIDATES
        .iter()
        .map(|name| Path::new(&ssh_dir).join(name))
        .filter(|path| {
            std::fs::read_to_string(path)
                .map(|content| content.contains("PRIVATE KEY"))
                .unwrap_or(false)
        })
        .collect()
}

/// Sanitize SSH error messages before they reach logs or users. Masks
/// auth method names and truncates anything that looks like a data dump.
fn sanitize_ssh_error(error: &impl std::fmt::Display) -> String {
    let mut msg = error.to_string();
    for method in &["publickey", "keyboard-interactive", "gssapi-with-mic"] {
        msg = msg.replace(method, "***");
    }
    if msg.len() > 500 {
        let mut cut = 500;
        while !msg.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated)", &msg[..cut])
    } else {
        msg
    }
}

/// Jump hosts are short-lived operator sessions against a managed host
/// pool; the server key is accepted and logged rather than pinned.
struct AcceptingHandler {
    host: String,
}

impl Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        tracing::debug!(
            host = %self.host,
            algorithm = %server_public_key.algorithm(),
            "Accepting jump host server key"
        );
        Ok(true)
    }
}

/// Production dialer backed by russh.
pub struct RusshDialer;

#[async_trait]
impl JumpDialer for RusshDialer {
    type Conn = RusshConnection;

    async fn dial(
        &self,
        host: &str,
        port: u16,
        auth: &JumpAuth,
        limits: &LimitsConfig,
    ) -> Result<Self::Conn, ConnectError> {
        let handle = establish(host, port, limits).await?;
        let handle = authenticate(handle, host, auth).await?;
        Ok(RusshConnection {
            handle,
            host: host.to_string(),
            max_output_bytes: limits.max_output_bytes,
        })
    }
}

/// Resolve the host and open the SSH transport under the connect timeout.
async fn establish(
    host: &str,
    port: u16,
    limits: &LimitsConfig,
) -> Result<Handle<AcceptingHandler>, ConnectError> {
    // Resolve up front so a dead DNS name is reported as such instead of
    // surfacing as a generic connect failure.
    let addr = lookup_host((host, port))
        .await
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ConnectError::DnsFailure {
            host: host.to_string(),
        })?;

    let config = Arc::new(Config {
        inactivity_timeout: Some(Duration::from_secs(300)),
        ..Default::default()
    });
    let handler = AcceptingHandler {
        host: host.to_string(),
    };

    let connect_timeout = Duration::from_secs(limits.connect_timeout_seconds);
    timeout(connect_timeout, client::connect(config, addr, handler))
        .await
        .map_err(|_| ConnectError::Timeout {
            host: host.to_string(),
            seconds: limits.connect_timeout_seconds,
        })?
        .map_err(|e| {
            tracing::debug!(host = %host, error = %sanitize_ssh_error(&e), "SSH transport failed");
            ConnectError::Transport {
                host: host.to_string(),
                reason: sanitize_ssh_error(&e),
            }
        })
}

/// Perform the single authentication attempt described by `auth`.
async fn authenticate(
    mut handle: Handle<AcceptingHandler>,
    host: &str,
    auth: &JumpAuth,
) -> Result<Handle<AcceptingHandler>, ConnectError> {
    match auth {
        JumpAuth::Key {
            username,
            key_paths,
        } => {
            for path in key_paths {
                let Ok(key_pair) = load_secret_key(path, None) else {
                    tracing::debug!(key = %path.display(), "Skipping unreadable key");
                    continue;
                };

                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                let key_with_hash = PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg);

                match handle.authenticate_publickey(username, key_with_hash).await {
                    Ok(result) if result.success() => return Ok(handle),
                    Ok(_) => {
                        tracing::debug!(host = %host, user = %username, key = %path.display(), "Key rejected");
                    }
                    Err(e) => {
                        tracing::debug!(host = %host, user = %username, error = %sanitize_ssh_error(&e), "Key authentication error");
                    }
                }
            }
            Err(ConnectError::AuthFailed {
                host: host.to_string(),
            })
        }
        JumpAuth::Password { username, password } => {
            let result = handle
                .authenticate_password(username, password.as_str())
                .await
                .map_err(|e| {
                    tracing::debug!(host = %host, user = %username, error = %sanitize_ssh_error(&e), "Password authentication error");
                    ConnectError::AuthFailed {
                        host: host.to_string(),
                    }
                })?;

            if result.success() {
                Ok(handle)
            } else {
                Err(ConnectError::AuthFailed {
                    host: host.to_string(),
                })
            }
        }
    }
}

/// An authenticated russh session to a jump host.
pub struct RusshConnection {
    handle: Handle<AcceptingHandler>,
    host: String,
    max_output_bytes: usize,
}

#[async_trait]
impl JumpConnection for RusshConnection {
    async fn exec(
        &mut self,
        command: &str,
        command_timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        let start = std::time::Instant::now();

        let mut channel =
            self.handle
                .channel_open_session()
                .await
                .map_err(|e| ExecError::Transport {
                    reason: format!("Failed to open channel: {e}"),
                })?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| ExecError::Transport {
                reason: format!("Failed to execute command: {e}"),
            })?;

        let (stdout, stderr, exit_code) =
            read_channel_output(&mut channel, command_timeout, self.max_output_bytes).await?;

        #[expect(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
            duration_ms,
        })
    }

    async fn close(&mut self) {
        // Bounded teardown so a dead transport cannot wedge disconnect.
        match timeout(
            Duration::from_secs(5),
            self.handle
                .disconnect(russh::Disconnect::ByApplication, "", "en"),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(host = %self.host, error = %e, "Error closing SSH connection");
            }
            Err(_) => {
                tracing::warn!(host = %self.host, "Timeout closing SSH connection, forcing drop");
            }
        }
    }
}

impl RusshConnection {
    /// Open an interactive shell on the jump host and hand back the raw
    /// byte stream. The caller owns the relay loop and its termination.
    pub async fn open_shell(
        &mut self,
    ) -> Result<impl AsyncRead + AsyncWrite + Send + Unpin, ExecError> {
        let channel =
            self.handle
                .channel_open_session()
                .await
                .map_err(|e| ExecError::Transport {
                    reason: format!("Failed to open channel for shell: {e}"),
                })?;

        channel
            .request_pty(true, "xterm", 120, 40, 0, 0, &[])
            .await
            .map_err(|e| ExecError::Transport {
                reason: format!("Failed to request pty: {e}"),
            })?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| ExecError::Transport {
                reason: format!("Failed to request shell: {e}"),
            })?;

        Ok(channel.into_stream())
    }
}

/// Drain a command channel, collecting both streams under the timeout and
/// the output size bound.
async fn read_channel_output(
    channel: &mut russh::Channel<russh::client::Msg>,
    command_timeout: Duration,
    max_output_bytes: usize,
) -> Result<(Vec<u8>, Vec<u8>, u32), ExecError> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = 0u32;
    let mut total_bytes = 0usize;

    let result = timeout(command_timeout, async {
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    total_bytes += data.len();
                    if total_bytes > max_output_bytes {
                        return Err(ExecError::Transport {
                            reason: format!("Output exceeds {max_output_bytes} bytes"),
                        });
                    }
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        total_bytes += data.len();
                        if total_bytes > max_output_bytes {
                            return Err(ExecError::Transport {
                                reason: format!("Output exceeds {max_output_bytes} bytes"),
                            });
                        }
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                }
                None => break,
                // Eof may arrive before or after ExitStatus; keep draining
                // until the channel fully closes.
                _ => {}
            }
        }
        Ok((stdout, stderr, exit_code))
    })
    .await;

    match result {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            let _ = channel.close().await;
            Err(ExecError::Timeout {
                seconds: command_timeout.as_secs(),
            })
        }
    }
}
