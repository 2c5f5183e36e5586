//! End-to-end device command flow against a scripted bastion.

use std::collections::VecDeque;

use async_trait::async_trait;

use netbridge::config::{
    AuthMethod, BastionDescriptor, BastionEndpoint, CommandCatalog, UsernamePolicy,
};
use netbridge::device::{DeviceCommandRunner, DeviceOs};
use netbridge::error::{ConnectError, ExecError, RunnerError};
use netbridge::ports::bastion::{BastionConnector, CommandOutput};

/// Bastion that replays a scripted response per executed command and
/// records everything it was asked to run.
struct ScriptedBastion {
    descriptor: BastionDescriptor,
    connected: bool,
    responses: VecDeque<Result<CommandOutput, ExecError>>,
    executed: Vec<String>,
}

impl ScriptedBastion {
    fn new(responses: Vec<Result<CommandOutput, ExecError>>) -> Self {
        Self {
            descriptor: BastionDescriptor {
                name: "scripted".to_string(),
                description: String::new(),
                region: String::new(),
                auth_method: AuthMethod::Password,
                endpoint: BastionEndpoint::SshJump {
                    host: "jump.test".to_string(),
                    fallback_host: None,
                    port: 22,
                },
            },
            connected: true,
            responses: responses.into(),
            executed: Vec::new(),
        }
    }

    fn stdout(text: &str) -> Result<CommandOutput, ExecError> {
        Ok(CommandOutput {
            stdout: text.to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 1,
        })
    }
}

#[async_trait]
impl BastionConnector for ScriptedBastion {
    fn descriptor(&self) -> &BastionDescriptor {
        &self.descriptor
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), ConnectError> {
        self.connected = true;
        Ok(())
    }

    async fn execute(&mut self, command: &str) -> Result<CommandOutput, ExecError> {
        if !self.connected {
            return Err(ExecError::NotConnected);
        }
        self.executed.push(command.to_string());
        self.responses.pop_front().unwrap_or_else(|| {
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: 0,
                duration_ms: 1,
            })
        })
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }
}

fn runner<'a>(
    bastion: &'a mut ScriptedBastion,
    catalog: &'a CommandCatalog,
    os: DeviceOs,
    usernames: &[&str],
) -> DeviceCommandRunner<'a, ScriptedBastion> {
    DeviceCommandRunner::new(
        bastion,
        "10.0.4.2".to_string(),
        os,
        catalog,
        &UsernamePolicy::default(),
        Some(usernames.iter().map(|s| (*s).to_string()).collect()),
    )
}

#[tokio::test]
async fn rotation_stops_at_first_accepted_username() {
    let mut bastion = ScriptedBastion::new(vec![
        ScriptedBastion::stdout(""),
        ScriptedBastion::stdout("Permission denied, please try again."),
        ScriptedBastion::stdout(
            "Cisco IOS Software, Catalyst Software, Version 17.6.5\n\
             switch uptime is 1 year, 2 weeks",
        ),
    ]);
    let catalog = CommandCatalog::default();

    let (parsed, username) = {
        let mut runner = runner(
            &mut bastion,
            &catalog,
            DeviceOs::CiscoIos,
            &["svc-bad", "netmon", "neteng", "never-tried"],
        );
        let parsed = runner.run_show("version").await.unwrap();
        (parsed, runner.current_username().map(String::from))
    };

    assert_eq!(username.as_deref(), Some("neteng"));
    assert_eq!(parsed["IOS_Version"], "17.6.5");
    assert_eq!(parsed["Uptime"], "1 year, 2 weeks");

    // The fourth candidate was never dialed.
    assert_eq!(bastion.executed.len(), 3);
    for hop in &bastion.executed {
        assert!(hop.starts_with("ssh -o StrictHostKeyChecking=no "));
        assert!(hop.ends_with("@10.0.4.2 'show version'"));
    }
}

#[tokio::test]
async fn exhaustion_carries_bounded_sample_and_os_tag() {
    let responses = (0..5)
        .map(|_| ScriptedBastion::stdout("Permission denied"))
        .collect();
    let mut bastion = ScriptedBastion::new(responses);
    let catalog = CommandCatalog::default();
    let mut runner = runner(
        &mut bastion,
        &catalog,
        DeviceOs::JuniperJunos,
        &["u1", "u2", "u3", "u4", "u5"],
    );

    let err = runner.run_show("version").await.unwrap_err();
    let RunnerError::AuthExhausted {
        tried,
        os_tag,
        guidance,
    } = err
    else {
        panic!("expected AuthExhausted");
    };

    assert_eq!(tried.len(), 5);
    assert_eq!(os_tag, "juniper_junos");
    assert!(guidance.contains("Tried 5 username(s): u1, u2, u3"));
    assert!(!guidance.contains("u4"));
    assert!(guidance.contains("juniper_junos"));
}

#[tokio::test]
async fn unsupported_alias_never_touches_the_bastion() {
    let mut bastion = ScriptedBastion::new(vec![]);
    let catalog = CommandCatalog::default();

    {
        let mut runner = runner(&mut bastion, &catalog, DeviceOs::SonicCli, &["admin"]);
        let err = runner.run_show("frobnicate").await.unwrap_err();
        assert!(matches!(err, RunnerError::UnsupportedCommand { .. }));
    }

    assert!(bastion.executed.is_empty());
}

#[tokio::test]
async fn custom_command_reuses_established_username() {
    let mut bastion = ScriptedBastion::new(vec![
        ScriptedBastion::stdout("Permission denied"),
        ScriptedBastion::stdout("Arista vEOS\nSoftware image version: 4.30.1F"),
        ScriptedBastion::stdout("Ethernet1 connected routed"),
        ScriptedBastion::stdout("Ethernet2 connected routed"),
    ]);
    let catalog = CommandCatalog::default();

    {
        let mut runner =
            runner(&mut bastion, &catalog, DeviceOs::AristaEos, &["ops", "admin"]);

        let first = runner.run_custom("show interfaces status").await.unwrap();
        assert_eq!(first.stdout, "Ethernet1 connected routed");
        assert_eq!(runner.current_username(), Some("admin"));

        let second = runner.run_custom("show interfaces status").await.unwrap();
        assert_eq!(second.stdout, "Ethernet2 connected routed");
    }

    // One rotation (two attempts) plus two direct custom commands.
    assert_eq!(bastion.executed.len(), 4);
    assert!(bastion.executed[2].contains("admin@10.0.4.2"));
    assert!(bastion.executed[3].contains("admin@10.0.4.2"));
}

#[tokio::test]
async fn session_transport_failure_aborts_immediately() {
    let mut bastion = ScriptedBastion::new(vec![Err(ExecError::Transport {
        reason: "channel closed".to_string(),
    })]);
    let catalog = CommandCatalog::default();

    {
        let mut runner = runner(&mut bastion, &catalog, DeviceOs::CiscoIos, &["a", "b", "c"]);
        let err = runner.run_show("version").await.unwrap_err();
        assert!(matches!(err, RunnerError::Exec(ExecError::Transport { .. })));
    }

    assert_eq!(bastion.executed.len(), 1);
}
