//! Jump host session with host and auth failover.
//!
//! Owns the ordering policy: primary host before fallback host, key
//! authentication before password on each host. The dialer port performs
//! the individual attempts, so the whole ladder is testable with a
//! scripted dialer.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::bastion::transport::RusshDialer;
use crate::config::{BastionDescriptor, BastionEndpoint, LimitsConfig};
use crate::error::{ConnectError, ExecError};
use crate::ports::bastion::{BastionConnector, CommandOutput, stderr_is_benign};
use crate::ports::dialer::{JumpAuth, JumpConnection, JumpDialer};

/// Typed lines that end an interactive session.
const SHELL_EXIT_WORDS: [&str; 3] = ["exit", "logout", "quit"];

/// A bastion session over one or two SSH jump hosts.
pub struct JumpboxSession<D: JumpDialer = RusshDialer> {
    descriptor: BastionDescriptor,
    dialer: D,
    limits: LimitsConfig,
    username: String,
    password: Option<Zeroizing<String>>,
    key_paths: Vec<PathBuf>,
    primary: String,
    fallback: Option<String>,
    port: u16,
    conn: Option<D::Conn>,
    connected_host: Option<String>,
}

impl<D: JumpDialer> JumpboxSession<D> {
    /// Build a session for an SSH jump endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor does not carry an SSH jump
    /// endpoint.
    pub fn new(
        descriptor: BastionDescriptor,
        dialer: D,
        limits: LimitsConfig,
        username: String,
        password: Option<Zeroizing<String>>,
        key_paths: Vec<PathBuf>,
    ) -> Result<Self, ConnectError> {
        let BastionEndpoint::SshJump {
            host,
            fallback_host,
            port,
        } = &descriptor.endpoint
        else {
            return Err(ConnectError::Transport {
                host: descriptor.name.clone(),
                reason: "endpoint is not an SSH jump host".to_string(),
            });
        };

        let primary = host.clone();
        let fallback = fallback_host.clone();
        let port = *port;

        Ok(Self {
            descriptor,
            dialer,
            limits,
            username,
            password,
            key_paths,
            primary,
            fallback,
            port,
            conn: None,
            connected_host: None,
        })
    }

    /// The host the current session is attached to, if any.
    #[must_use]
    pub fn connected_host(&self) -> Option<&str> {
        self.connected_host.as_deref()
    }

    /// Auth attempts for one host: key first when any key was discovered,
    /// then password when one is available.
    fn auth_ladder(&self) -> Vec<JumpAuth> {
        let mut ladder = Vec::new();
        if !self.key_paths.is_empty() {
            ladder.push(JumpAuth::Key {
                username: self.username.clone(),
                key_paths: self.key_paths.clone(),
            });
        }
        if let Some(password) = &self.password {
            ladder.push(JumpAuth::Password {
                username: self.username.clone(),
                password: password.clone(),
            });
        }
        ladder
    }
}

#[async_trait]
impl<D: JumpDialer> BastionConnector for JumpboxSession<D> {
    fn descriptor(&self) -> &BastionDescriptor {
        &self.descriptor
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self) -> Result<(), ConnectError> {
        if self.conn.is_some() {
            return Ok(());
        }

        let ladder = self.auth_ladder();
        if ladder.is_empty() {
            warn!(bastion = %self.descriptor.name, "No SSH keys found and no password provided");
            return Err(ConnectError::AuthFailed {
                host: self.primary.clone(),
            });
        }

        let hosts: Vec<String> = std::iter::once(self.primary.clone())
            .chain(self.fallback.clone())
            .collect();

        let mut last_err: Option<ConnectError> = None;
        for host in &hosts {
            for auth in &ladder {
                info!(
                    bastion = %self.descriptor.name,
                    host = %host,
                    user = %auth.username(),
                    method = auth.method(),
                    "Connecting to jump host"
                );
                match self.dialer.dial(host, self.port, auth, &self.limits).await {
                    Ok(conn) => {
                        info!(bastion = %self.descriptor.name, host = %host, "Jump host session established");
                        self.conn = Some(conn);
                        self.connected_host = Some(host.to_string());
                        return Ok(());
                    }
                    Err(e) => {
                        warn!(
                            bastion = %self.descriptor.name,
                            host = %host,
                            method = auth.method(),
                            error = %e,
                            "Jump host attempt failed"
                        );
                        // Only an auth rejection is worth retrying with the
                        // next method; timeouts and transport failures fail
                        // the host for every method.
                        let auth_rejection = matches!(e, ConnectError::AuthFailed { .. });
                        last_err = Some(e);
                        if !auth_rejection {
                            break;
                        }
                    }
                }
            }
        }

        Err(last_err.unwrap_or(ConnectError::AuthFailed {
            host: self.primary.clone(),
        }))
    }

    async fn execute(&mut self, command: &str) -> Result<CommandOutput, ExecError> {
        let conn = self.conn.as_mut().ok_or(ExecError::NotConnected)?;
        let command_timeout = Duration::from_secs(self.limits.command_timeout_seconds);
        let output = conn.exec(command, command_timeout).await?;

        if !stderr_is_benign(&output.stderr) {
            return Err(ExecError::Remote {
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    async fn disconnect(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close().await;
        }
        self.connected_host = None;
    }
}

impl JumpboxSession<RusshDialer> {
    /// Relay an interactive shell between the operator's terminal and the
    /// jump host. Returns when the remote closes the stream or the
    /// operator types an exit word.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is connected or the shell stream
    /// breaks mid-relay.
    pub async fn interactive_shell(&mut self) -> Result<(), ExecError> {
        let conn = self.conn.as_mut().ok_or(ExecError::NotConnected)?;
        let mut shell = conn.open_shell().await?;

        let cancel = CancellationToken::new();
        let (line_tx, mut line_rx) = mpsc::channel::<String>(8);

        // Stdin is read on a side task so the relay loop can select over
        // shell output and typed lines at the same time.
        let stdin_cancel = cancel.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                tokio::select! {
                    () = stdin_cancel.cancelled() => break,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            if line_tx.send(line).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) | Err(_) => break,
                    },
                }
            }
        });

        let mut stdout = tokio::io::stdout();
        let mut buf = [0u8; 4096];
        let result = loop {
            tokio::select! {
                read = shell.read(&mut buf) => match read {
                    Ok(0) => break Ok(()),
                    Ok(n) => {
                        if let Err(e) = write_all_flush(&mut stdout, &buf[..n]).await {
                            break Err(ExecError::Transport { reason: e.to_string() });
                        }
                    }
                    Err(e) => break Err(ExecError::Transport { reason: e.to_string() }),
                },
                line = line_rx.recv() => match line {
                    Some(line) => {
                        let leaving = SHELL_EXIT_WORDS.contains(&line.trim());
                        if let Err(e) = write_all_flush(&mut shell, format!("{line}\n").as_bytes()).await {
                            break Err(ExecError::Transport { reason: e.to_string() });
                        }
                        if leaving {
                            // Drain whatever the remote prints on logout,
                            // bounded so a silent peer cannot hang us.
                            let _ = timeout(Duration::from_secs(2), shell.read(&mut buf)).await;
                            break Ok(());
                        }
                    }
                    None => break Ok(()),
                },
            }
        };

        cancel.cancel();
        // Bounded grace join; a stdin task stuck in a blocking read dies
        // with the process.
        let _ = timeout(Duration::from_secs(1), reader).await;

        result
    }
}

async fn write_all_flush<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> std::io::Result<()> {
    writer.write_all(data).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthMethod;
    use crate::error::ConnectError;
    use crate::ports::dialer::mock::{DialScript, MockDialer};

    fn descriptor(fallback: Option<&str>) -> BastionDescriptor {
        BastionDescriptor {
            name: "core-jump".to_string(),
            description: String::new(),
            region: "on-prem".to_string(),
            auth_method: AuthMethod::Password,
            endpoint: BastionEndpoint::SshJump {
                host: "jump01.net.example.com".to_string(),
                fallback_host: fallback.map(String::from),
                port: 22,
            },
        }
    }

    fn session(
        dialer: MockDialer,
        fallback: Option<&str>,
        password: Option<&str>,
        key_paths: Vec<PathBuf>,
    ) -> JumpboxSession<MockDialer> {
        JumpboxSession::new(
            descriptor(fallback),
            dialer,
            LimitsConfig::default(),
            "neteng".to_string(),
            password.map(|p| Zeroizing::new(p.to_string())),
            key_paths,
        )
        .unwrap()
    }

    // ============== Failover Ordering ==============

    #[tokio::test]
    async fn test_primary_failure_falls_back() {
        let dialer = MockDialer::new(vec![
            DialScript::Reject(|host| ConnectError::Timeout { host, seconds: 10 }),
            DialScript::Accept,
        ]);
        let attempts = dialer.attempts.clone();
        let mut session = session(dialer, Some("jump02.net.example.com"), Some("pw"), vec![]);

        session.connect().await.unwrap();
        assert_eq!(session.connected_host(), Some("jump02.net.example.com"));

        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts[0].0, "jump01.net.example.com");
        assert_eq!(attempts[1].0, "jump02.net.example.com");
    }

    #[tokio::test]
    async fn test_key_tried_before_password_on_each_host() {
        let dialer = MockDialer::new(vec![
            DialScript::Reject(|host| ConnectError::AuthFailed { host }),
            DialScript::Reject(|host| ConnectError::AuthFailed { host }),
            DialScript::Reject(|host| ConnectError::AuthFailed { host }),
            DialScript::Accept,
        ]);
        let attempts = dialer.attempts.clone();
        let mut session = session(
            dialer,
            Some("jump02.net.example.com"),
            Some("pw"),
            vec![PathBuf::from("/home/op/.ssh/id_ed25519")],
        );

        session.connect().await.unwrap();

        let attempts = attempts.lock().unwrap();
        let methods: Vec<(&str, &str)> = attempts
            .iter()
            .map(|(host, _, method)| (host.as_str(), *method))
            .collect();
        assert_eq!(
            methods,
            vec![
                ("jump01.net.example.com", "key"),
                ("jump01.net.example.com", "password"),
                ("jump02.net.example.com", "key"),
                ("jump02.net.example.com", "password"),
            ]
        );
    }

    #[tokio::test]
    async fn test_host_timeout_skips_remaining_auth_methods() {
        let dialer = MockDialer::new(vec![
            DialScript::Reject(|host| ConnectError::Timeout { host, seconds: 10 }),
            DialScript::Accept,
        ]);
        let attempts = dialer.attempts.clone();
        let mut session = session(
            dialer,
            Some("jump02.net.example.com"),
            Some("pw"),
            vec![PathBuf::from("/home/op/.ssh/id_ed25519")],
        );

        session.connect().await.unwrap();

        // The password ladder rung on the timed-out host was never tried.
        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].0, "jump01.net.example.com");
        assert_eq!(attempts[1].0, "jump02.net.example.com");
        assert_eq!(attempts[1].2, "key");
    }

    #[tokio::test]
    async fn test_all_hosts_fail_returns_last_error() {
        let dialer = MockDialer::new(vec![
            DialScript::Reject(|host| ConnectError::Timeout { host, seconds: 10 }),
            DialScript::Reject(|host| ConnectError::AuthFailed { host }),
        ]);
        let mut session = session(dialer, Some("jump02.net.example.com"), Some("pw"), vec![]);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            ConnectError::AuthFailed { host } if host == "jump02.net.example.com"
        ));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_no_credentials_is_auth_failure_without_dialing() {
        let dialer = MockDialer::new(vec![]);
        let attempts = dialer.attempts.clone();
        let mut session = session(dialer, None, None, vec![]);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, ConnectError::AuthFailed { .. }));
        assert!(attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_is_idempotent_once_connected() {
        let dialer = MockDialer::new(vec![DialScript::Accept]);
        let attempts = dialer.attempts.clone();
        let mut session = session(dialer, None, Some("pw"), vec![]);

        session.connect().await.unwrap();
        session.connect().await.unwrap();
        assert_eq!(attempts.lock().unwrap().len(), 1);
    }

    // ============== Execute / Disconnect ==============

    #[tokio::test]
    async fn test_execute_requires_connection() {
        let dialer = MockDialer::new(vec![]);
        let mut session = session(dialer, None, Some("pw"), vec![]);

        let err = session.execute("whoami").await.unwrap_err();
        assert!(matches!(err, ExecError::NotConnected));
    }

    #[tokio::test]
    async fn test_execute_rejects_non_benign_stderr() {
        let dialer = MockDialer::new(vec![DialScript::Accept]);
        let mut session = session(dialer, None, Some("pw"), vec![]);
        session.connect().await.unwrap();

        if let Some(conn) = session.conn.as_mut() {
            conn.responses.push_back(Ok(CommandOutput {
                stdout: String::new(),
                stderr: "ssh: connection refused".to_string(),
                exit_code: 255,
                duration_ms: 5,
            }));
        }

        let err = session.execute("ssh 10.0.0.1 'show version'").await.unwrap_err();
        assert!(matches!(err, ExecError::Remote { .. }));
    }

    #[tokio::test]
    async fn test_execute_allows_warning_stderr() {
        let dialer = MockDialer::new(vec![DialScript::Accept]);
        let mut session = session(dialer, None, Some("pw"), vec![]);
        session.connect().await.unwrap();

        if let Some(conn) = session.conn.as_mut() {
            conn.responses.push_back(Ok(CommandOutput {
                stdout: "Cisco IOS Software".to_string(),
                stderr: "Warning: Permanently added host".to_string(),
                exit_code: 0,
                duration_ms: 5,
            }));
        }

        let output = session.execute("ssh 10.0.0.1 'show version'").await.unwrap();
        assert_eq!(output.stdout, "Cisco IOS Software");
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let dialer = MockDialer::new(vec![DialScript::Accept]);
        let mut session = session(dialer, None, Some("pw"), vec![]);

        session.disconnect().await;
        session.connect().await.unwrap();
        session.disconnect().await;
        session.disconnect().await;
        assert!(!session.is_connected());
        assert!(session.connected_host().is_none());
    }
}
