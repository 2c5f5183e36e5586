use std::path::Path;

use tracing::{info, warn};

use super::types::{BastionEndpoint, Config};
use crate::error::ConfigError;

/// Load configuration from a YAML file.
///
/// # Errors
///
/// Returns an error if the file does not exist, cannot be read or parsed,
/// or fails validation (empty bastion catalog, unknown default bastion,
/// malformed endpoints).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }

    // Config files may carry passwords for lab setups; nag about loose modes.
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.mode() & 0o777;
            if mode & 0o037 != 0 {
                warn!(
                    config_path = %path.display(),
                    permissions = format!("{mode:04o}"),
                    "Config file has permissive permissions. Consider: chmod 640 {}",
                    path.display()
                );
            }
        }
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_saphyr::from_str(&content)?;

    validate_config(&config)?;

    info!(
        bastions = config.bastions.len(),
        devices = config.devices.len(),
        "Configuration loaded"
    );

    Ok(config)
}

/// Validate the configuration.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.bastions.is_empty() {
        return Err(ConfigError::Invalid {
            field: "bastions".to_string(),
            reason: "At least one bastion must be defined".to_string(),
        });
    }

    if !config.bastions.contains_key(&config.default_bastion) {
        return Err(ConfigError::Invalid {
            field: "default_bastion".to_string(),
            reason: format!("'{}' is not in the bastion catalog", config.default_bastion),
        });
    }

    for (id, descriptor) in &config.bastions {
        if descriptor.name.is_empty() {
            return Err(ConfigError::Invalid {
                field: format!("bastions.{id}.name"),
                reason: "Name cannot be empty".to_string(),
            });
        }

        match &descriptor.endpoint {
            BastionEndpoint::SshJump { host, port, .. } => {
                if host.is_empty() {
                    return Err(ConfigError::Invalid {
                        field: format!("bastions.{id}.host"),
                        reason: "Host cannot be empty".to_string(),
                    });
                }
                if *port == 0 {
                    return Err(ConfigError::Invalid {
                        field: format!("bastions.{id}.port"),
                        reason: "Port cannot be 0".to_string(),
                    });
                }
            }
            BastionEndpoint::CloudTunnel {
                instance,
                zone,
                project,
            } => {
                for (field, value) in [("instance", instance), ("zone", zone), ("project", project)]
                {
                    if value.is_empty() {
                        return Err(ConfigError::Invalid {
                            field: format!("bastions.{id}.{field}"),
                            reason: format!("{field} cannot be empty"),
                        });
                    }
                }
            }
        }
    }

    if config.limits.command_timeout_seconds == 0 {
        return Err(ConfigError::Invalid {
            field: "limits.command_timeout_seconds".to_string(),
            reason: "Command timeout cannot be 0".to_string(),
        });
    }

    Ok(())
}
