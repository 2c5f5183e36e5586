//! Bastion connector port.
//!
//! Abstracts the two bastion families (SSH jump host, cloud CLI tunnel)
//! behind one capability set so that the device command runner never
//! branches on bastion type.

use async_trait::async_trait;

use crate::config::BastionDescriptor;
use crate::error::{ConnectError, ExecError};

/// Output from a command executed through a bastion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: u32,
    pub duration_ms: u64,
}

/// Uniform bastion capability set: connect, execute, disconnect.
///
/// Implementations perform no retries; failover across hosts or usernames
/// is policy owned by the caller. `execute` requires a connected session
/// and `disconnect` is idempotent.
#[async_trait]
pub trait BastionConnector: Send {
    /// The catalog descriptor this connector was built from.
    fn descriptor(&self) -> &BastionDescriptor;

    fn is_connected(&self) -> bool;

    /// Establish the bastion session. For cloud tunnels the session is
    /// logical: preflight checks pass and per-command subprocess calls do
    /// the rest.
    async fn connect(&mut self) -> Result<(), ConnectError>;

    /// Run a command on the bastion host and collect both output streams
    /// under the command timeout.
    async fn execute(&mut self, command: &str) -> Result<CommandOutput, ExecError>;

    /// Release the transport and clear the connected flag. Safe to call at
    /// any time, including before `connect` or twice in a row.
    async fn disconnect(&mut self);
}

/// Treat a non-empty error stream as failure unless it only carries an
/// advisory warning (sshd prints host-key warnings on stderr for every
/// hop). Preserved behavior from the original tooling.
#[must_use]
pub fn stderr_is_benign(stderr: &str) -> bool {
    stderr.trim().is_empty() || stderr.contains("Warning")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_benign_empty() {
        assert!(stderr_is_benign(""));
        assert!(stderr_is_benign("   \n"));
    }

    #[test]
    fn test_stderr_benign_warning() {
        assert!(stderr_is_benign(
            "Warning: Permanently added '10.0.0.1' (ED25519) to the list of known hosts."
        ));
    }

    #[test]
    fn test_stderr_not_benign() {
        assert!(!stderr_is_benign("ssh: connect to host 10.0.0.1 port 22: Connection refused"));
        assert!(!stderr_is_benign("Permission denied (publickey,password)."));
    }

    #[tokio::test]
    async fn test_mock_bastion_scripted_responses() {
        let mut mock = mock::MockBastion::connected();
        mock.push_stdout("first");
        mock.push_error(ExecError::Timeout { seconds: 15 });

        let out = mock.execute("show version").await.unwrap();
        assert_eq!(out.stdout, "first");

        let err = mock.execute("show version").await.unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));

        assert_eq!(mock.executed.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_bastion_not_connected() {
        let mut mock = mock::MockBastion::connected();
        mock.disconnect().await;
        let err = mock.execute("whoami").await.unwrap_err();
        assert!(matches!(err, ExecError::NotConnected));
        assert!(mock.executed.is_empty());
    }
}
