//! Jump host dialer port.
//!
//! Separates "open one SSH session with one auth attempt" from the
//! failover policy that orders hosts and auth methods. The policy layer
//! in `bastion::jumpbox` is generic over this trait so it can be tested
//! with a scripted dialer.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::config::LimitsConfig;
use crate::error::{ConnectError, ExecError};
use crate::ports::bastion::CommandOutput;

/// One authentication attempt against a jump host. Deliberately not
/// `Debug`: the password must never reach logs.
#[derive(Clone)]
pub enum JumpAuth {
    /// Try each key path in order until one is accepted.
    Key {
        username: String,
        key_paths: Vec<PathBuf>,
    },
    Password {
        username: String,
        password: Zeroizing<String>,
    },
}

impl JumpAuth {
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::Key { username, .. } | Self::Password { username, .. } => username,
        }
    }

    /// Short tag for logs. Never includes the secret.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::Password { .. } => "password",
        }
    }
}

/// Opens a single SSH session to a jump host. No retries, no host
/// ordering; one call is one attempt.
#[async_trait]
pub trait JumpDialer: Send + Sync {
    type Conn: JumpConnection;

    async fn dial(
        &self,
        host: &str,
        port: u16,
        auth: &JumpAuth,
        limits: &LimitsConfig,
    ) -> Result<Self::Conn, ConnectError>;
}

/// An established jump host session.
#[async_trait]
pub trait JumpConnection: Send {
    /// Execute a command on the jump host, bounded by `timeout`.
    async fn exec(&mut self, command: &str, timeout: Duration)
        -> Result<CommandOutput, ExecError>;

    /// Close the underlying transport. Errors during teardown are logged
    /// by implementations, not surfaced.
    async fn close(&mut self);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_auth_username_and_method() {
        let key = JumpAuth::Key {
            username: "neteng".to_string(),
            key_paths: vec![PathBuf::from("/home/op/.ssh/id_ed25519")],
        };
        assert_eq!(key.username(), "neteng");
        assert_eq!(key.method(), "key");

        let password = JumpAuth::Password {
            username: "neteng".to_string(),
            password: Zeroizing::new("hunter2".to_string()),
        };
        assert_eq!(password.username(), "neteng");
        assert_eq!(password.method(), "password");
    }

    #[tokio::test]
    async fn test_mock_dialer_records_attempts() {
        let dialer = mock::MockDialer::new(vec![
            mock::DialScript::Reject(|host| ConnectError::Timeout { host, seconds: 10 }),
            mock::DialScript::Accept,
        ]);
        let auth = JumpAuth::Password {
            username: "admin".to_string(),
            password: Zeroizing::new("x".to_string()),
        };
        let limits = LimitsConfig::default();

        assert!(dialer.dial("jump01", 22, &auth, &limits).await.is_err());
        assert!(dialer.dial("jump02", 22, &auth, &limits).await.is_ok());

        let attempts = dialer.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].0, "jump01");
        assert_eq!(attempts[1].0, "jump02");
    }
}
