//! Bastion adapters and the factory that picks one per catalog entry.

mod cloud_tunnel;
mod jumpbox;
mod transport;

pub use cloud_tunnel::CloudTunnelBastion;
pub use jumpbox::JumpboxSession;
pub use transport::{RusshDialer, discover_private_keys};

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::config::{BastionDescriptor, BastionEndpoint, LimitsConfig};
use crate::error::{ConnectError, ExecError};
use crate::ports::bastion::{BastionConnector, CommandOutput};

/// A concrete bastion of either family.
///
/// An enum rather than a trait object so that family-specific surface
/// (the interactive shell) stays available to the CLI without downcasts.
pub enum Bastion {
    Jump(JumpboxSession),
    Cloud(CloudTunnelBastion),
}

impl Bastion {
    /// Relay an interactive session on the bastion to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is connected or the relay breaks.
    pub async fn interactive_shell(&mut self) -> Result<(), ExecError> {
        match self {
            Self::Jump(session) => session.interactive_shell().await,
            Self::Cloud(tunnel) => tunnel.interactive_shell().await,
        }
    }
}

#[async_trait]
impl BastionConnector for Bastion {
    fn descriptor(&self) -> &BastionDescriptor {
        match self {
            Self::Jump(session) => session.descriptor(),
            Self::Cloud(tunnel) => tunnel.descriptor(),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Jump(session) => session.is_connected(),
            Self::Cloud(tunnel) => tunnel.is_connected(),
        }
    }

    async fn connect(&mut self) -> Result<(), ConnectError> {
        match self {
            Self::Jump(session) => session.connect().await,
            Self::Cloud(tunnel) => tunnel.connect().await,
        }
    }

    async fn execute(&mut self, command: &str) -> Result<CommandOutput, ExecError> {
        match self {
            Self::Jump(session) => session.execute(command).await,
            Self::Cloud(tunnel) => tunnel.execute(command).await,
        }
    }

    async fn disconnect(&mut self) {
        match self {
            Self::Jump(session) => session.disconnect().await,
            Self::Cloud(tunnel) => tunnel.disconnect().await,
        }
    }
}

/// Build the right connector for a catalog entry.
///
/// SSH jump endpoints discover the operator's private keys here so that
/// key-then-password ordering is in place before the first attempt.
///
/// # Errors
///
/// Returns an error if the descriptor and connector family disagree,
/// which validation rules out for loaded configs.
pub fn connector_for(
    descriptor: BastionDescriptor,
    limits: LimitsConfig,
    username: String,
    password: Option<Zeroizing<String>>,
) -> Result<Bastion, ConnectError> {
    match descriptor.endpoint {
        BastionEndpoint::SshJump { .. } => Ok(Bastion::Jump(JumpboxSession::new(
            descriptor,
            RusshDialer,
            limits,
            username,
            password,
            discover_private_keys(),
        )?)),
        BastionEndpoint::CloudTunnel { .. } => {
            Ok(Bastion::Cloud(CloudTunnelBastion::new(descriptor, limits)?))
        }
    }
}
