use thiserror::Error;

/// Errors raised while establishing a bastion session.
///
/// Each failure condition is a distinct kind so that the caller can apply
/// failover policy (next auth method, next host) without string matching.
/// No retries happen at the layer that raises one of these.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("authentication rejected by {host}")]
    AuthFailed { host: String },

    #[error("connection to {host} timed out after {seconds}s")]
    Timeout { host: String, seconds: u64 },

    #[error("cannot resolve hostname: {host}")]
    DnsFailure { host: String },

    #[error("transport error on {host}: {reason}")]
    Transport { host: String, reason: String },

    #[error("bastion preflight failed: {0}")]
    Preflight(#[from] PreflightError),
}

/// Cloud-tunnel preflight failures. These are configuration problems on the
/// operator's workstation, not network errors, and the tunnel is never
/// attempted once one is raised.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("cloud CLI `{binary}` not found on PATH")]
    MissingCli { binary: String },

    #[error("no authenticated cloud identity (run `{hint}`)")]
    NotAuthenticated { hint: String },
}

/// Errors raised while executing a command through a connected bastion.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("not connected to bastion")]
    NotConnected,

    #[error("command timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("remote command failed: {stderr}")]
    Remote { stderr: String },

    #[error("transport error: {reason}")]
    Transport { reason: String },
}

/// Errors raised by the device command runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("command alias '{alias}' is not available on {os_tag}")]
    UnsupportedCommand { alias: String, os_tag: String },

    /// Every candidate username was rejected. `guidance` carries the full
    /// user-facing message including a bounded sample of the tried names
    /// and static troubleshooting steps.
    #[error("{guidance}")]
    AuthExhausted {
        tried: Vec<String>,
        os_tag: String,
        guidance: String,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    NotFound { path: String },

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

/// Errors surfaced by the command-line entry points.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown bastion '{id}' (see `netbridge bastions`)")]
    UnknownBastion { id: String },

    #[error("unknown device '{name}' (see `netbridge devices`)")]
    UnknownDevice { name: String },

    #[error("device '{name}' has no management address in the inventory")]
    DeviceUnreachable { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_display() {
        let err = ConnectError::AuthFailed {
            host: "jump01".to_string(),
        };
        assert!(format!("{err}").contains("jump01"));

        let err = ConnectError::Timeout {
            host: "jump01".to_string(),
            seconds: 10,
        };
        let msg = format!("{err}");
        assert!(msg.contains("jump01"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_preflight_error_wraps_into_connect_error() {
        let err: ConnectError = PreflightError::MissingCli {
            binary: "gcloud".to_string(),
        }
        .into();
        let msg = format!("{err}");
        assert!(msg.contains("preflight"));
        assert!(msg.contains("gcloud"));
    }

    #[test]
    fn test_exec_error_display() {
        let err = ExecError::Remote {
            stderr: "connection refused".to_string(),
        };
        assert!(format!("{err}").contains("connection refused"));

        let err = ExecError::NotConnected;
        assert!(format!("{err}").contains("not connected"));
    }

    #[test]
    fn test_runner_error_unsupported_display() {
        let err = RunnerError::UnsupportedCommand {
            alias: "bgp_summary".to_string(),
            os_tag: "unknown".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("bgp_summary"));
        assert!(msg.contains("unknown"));
    }

    #[test]
    fn test_runner_error_auth_exhausted_uses_guidance() {
        let err = RunnerError::AuthExhausted {
            tried: vec!["admin".to_string(), "neteng".to_string()],
            os_tag: "cisco_ios".to_string(),
            guidance: "Authentication failed. Tried 2 username(s)".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Authentication failed. Tried 2 username(s)"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            field: "bastions".to_string(),
            reason: "empty".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("bastions"));
        assert!(msg.contains("empty"));
    }
}
