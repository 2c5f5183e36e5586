//! Jump host failover policy exercised through a scripted dialer.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use zeroize::Zeroizing;

use netbridge::bastion::JumpboxSession;
use netbridge::config::{AuthMethod, BastionDescriptor, BastionEndpoint, LimitsConfig};
use netbridge::error::{ConnectError, ExecError};
use netbridge::ports::bastion::{BastionConnector, CommandOutput};
use netbridge::ports::dialer::{JumpAuth, JumpConnection, JumpDialer};

enum Script {
    Accept,
    Timeout,
    AuthFailed,
}

struct ScriptedDialer {
    script: Mutex<VecDeque<Script>>,
    attempts: Arc<Mutex<Vec<(String, &'static str)>>>,
}

impl ScriptedDialer {
    fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl JumpDialer for ScriptedDialer {
    type Conn = ScriptedConnection;

    async fn dial(
        &self,
        host: &str,
        _port: u16,
        auth: &JumpAuth,
        _limits: &LimitsConfig,
    ) -> Result<Self::Conn, ConnectError> {
        self.attempts
            .lock()
            .unwrap()
            .push((host.to_string(), auth.method()));
        match self.script.lock().unwrap().pop_front() {
            Some(Script::Accept) | None => Ok(ScriptedConnection::default()),
            Some(Script::Timeout) => Err(ConnectError::Timeout {
                host: host.to_string(),
                seconds: 10,
            }),
            Some(Script::AuthFailed) => Err(ConnectError::AuthFailed {
                host: host.to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct ScriptedConnection {
    responses: VecDeque<CommandOutput>,
}

#[async_trait]
impl JumpConnection for ScriptedConnection {
    async fn exec(
        &mut self,
        _command: &str,
        _timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        Ok(self.responses.pop_front().unwrap_or(CommandOutput {
            stdout: "ok".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 1,
        }))
    }

    async fn close(&mut self) {}
}

fn descriptor(fallback: Option<&str>) -> BastionDescriptor {
    BastionDescriptor {
        name: "core-jump".to_string(),
        description: String::new(),
        region: "on-prem".to_string(),
        auth_method: AuthMethod::Password,
        endpoint: BastionEndpoint::SshJump {
            host: "jump01.test".to_string(),
            fallback_host: fallback.map(String::from),
            port: 22,
        },
    }
}

fn session(
    dialer: ScriptedDialer,
    fallback: Option<&str>,
    password: Option<&str>,
    key_paths: Vec<PathBuf>,
) -> JumpboxSession<ScriptedDialer> {
    JumpboxSession::new(
        descriptor(fallback),
        dialer,
        LimitsConfig::default(),
        "operator".to_string(),
        password.map(|p| Zeroizing::new(p.to_string())),
        key_paths,
    )
    .unwrap()
}

#[tokio::test]
async fn primary_timeout_falls_back_and_session_works() {
    let dialer = ScriptedDialer::new(vec![Script::Timeout, Script::Accept]);
    let attempts = dialer.attempts.clone();
    let mut session = session(dialer, Some("jump02.test"), Some("pw"), vec![]);

    session.connect().await.unwrap();
    assert!(session.is_connected());
    assert_eq!(session.connected_host(), Some("jump02.test"));

    let output = session.execute("hostname").await.unwrap();
    assert_eq!(output.stdout, "ok");

    let attempts = attempts.lock().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].0, "jump01.test");
    assert_eq!(attempts[1].0, "jump02.test");
}

#[tokio::test]
async fn auth_ladder_is_key_then_password_per_host() {
    let dialer = ScriptedDialer::new(vec![
        Script::AuthFailed,
        Script::AuthFailed,
        Script::AuthFailed,
        Script::Accept,
    ]);
    let attempts = dialer.attempts.clone();
    let mut session = session(
        dialer,
        Some("jump02.test"),
        Some("pw"),
        vec![PathBuf::from("/tmp/id_ed25519")],
    );

    session.connect().await.unwrap();

    let attempts = attempts.lock().unwrap();
    let seen: Vec<(&str, &str)> = attempts
        .iter()
        .map(|(host, method)| (host.as_str(), *method))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("jump01.test", "key"),
            ("jump01.test", "password"),
            ("jump02.test", "key"),
            ("jump02.test", "password"),
        ]
    );
}

#[tokio::test]
async fn single_host_failure_surfaces_last_error() {
    let dialer = ScriptedDialer::new(vec![Script::AuthFailed]);
    let mut session = session(dialer, None, Some("bad-pw"), vec![]);

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, ConnectError::AuthFailed { .. }));
    assert!(!session.is_connected());

    let err = session.execute("hostname").await.unwrap_err();
    assert!(matches!(err, ExecError::NotConnected));
}

#[tokio::test]
async fn disconnect_is_idempotent_and_resets_host() {
    let dialer = ScriptedDialer::new(vec![Script::Accept]);
    let mut session = session(dialer, None, Some("pw"), vec![]);

    session.connect().await.unwrap();
    session.disconnect().await;
    session.disconnect().await;
    assert!(!session.is_connected());
    assert!(session.connected_host().is_none());
    assert_eq!(session.descriptor().kind(), "ssh-jump");
}
