use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Every section has a serde default so the tool runs without a config
/// file, using the built-in bastion catalog and username/command tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Bastion catalog, keyed by bastion id. Immutable after load.
    #[serde(default = "default_bastions")]
    pub bastions: HashMap<String, BastionDescriptor>,

    /// Bastion id used when the caller does not pick one.
    #[serde(default = "default_bastion_id")]
    pub default_bastion: String,

    /// Static device inventory backing the device lookup port.
    #[serde(default)]
    pub devices: HashMap<String, DeviceEntry>,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub usernames: UsernamePolicy,

    #[serde(default)]
    pub commands: CommandCatalog,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bastions: default_bastions(),
            default_bastion: default_bastion_id(),
            devices: HashMap::new(),
            limits: LimitsConfig::default(),
            usernames: UsernamePolicy::default(),
            commands: CommandCatalog::default(),
        }
    }
}

impl Config {
    /// Look up a bastion descriptor by id.
    #[must_use]
    pub fn bastion(&self, id: &str) -> Option<&BastionDescriptor> {
        self.bastions.get(id)
    }
}

/// A bastion endpoint from the catalog.
///
/// The endpoint variant carries the type-specific connection parameters;
/// everything else is shared identity metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BastionDescriptor {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub auth_method: AuthMethod,

    #[serde(flatten)]
    pub endpoint: BastionEndpoint,
}

impl BastionDescriptor {
    /// Short tag for the bastion type, used in logs and listings.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self.endpoint {
            BastionEndpoint::SshJump { .. } => "ssh-jump",
            BastionEndpoint::CloudTunnel { .. } => "cloud-tunnel",
        }
    }
}

/// Type-specific bastion connection parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BastionEndpoint {
    /// Traditional SSH jump host, optionally with a fallback host that is
    /// tried when the primary fails.
    SshJump {
        host: String,
        #[serde(default)]
        fallback_host: Option<String>,
        #[serde(default = "default_ssh_port")]
        port: u16,
    },
    /// Bastion reached through a cloud provider CLI tunnel. There is no
    /// persistent socket; each command is wrapped in a CLI subprocess call.
    CloudTunnel {
        instance: String,
        zone: String,
        project: String,
    },
}

/// How the operator authenticates to the bastion itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    #[default]
    Password,
    Key,
    CloudAuth,
}

/// One device in the static inventory. Devices without a management IP are
/// listed but cannot be reached; the CLI reports that to the user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceEntry {
    #[serde(default)]
    pub management_ip: Option<String>,

    #[serde(default = "default_os_type")]
    pub os_type: String,

    #[serde(default = "default_device_state")]
    pub state: String,
}

/// Timeouts and output bounds for all network operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,

    /// Timeout for cloud CLI preflight checks (version / auth list).
    #[serde(default = "default_preflight_timeout")]
    pub preflight_timeout_seconds: u64,

    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
            command_timeout_seconds: default_command_timeout(),
            preflight_timeout_seconds: default_preflight_timeout(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// Username candidate tables, combined per device OS by the runner:
/// device-specific names first, then the global defaults, then (for
/// Cisco-family devices) the Cisco extras, deduplicated in first-occurrence
/// order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UsernamePolicy {
    #[serde(default = "default_usernames")]
    pub defaults: Vec<String>,

    #[serde(default = "default_device_specific")]
    pub device_specific: HashMap<String, Vec<String>>,

    #[serde(default = "default_cisco_extras")]
    pub cisco_extras: Vec<String>,
}

impl Default for UsernamePolicy {
    fn default() -> Self {
        Self {
            defaults: default_usernames(),
            device_specific: default_device_specific(),
            cisco_extras: default_cisco_extras(),
        }
    }
}

/// Per-OS tables mapping command aliases to the actual CLI vocabulary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandCatalog {
    #[serde(default = "default_show_commands")]
    pub show_commands: HashMap<String, HashMap<String, String>>,
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self {
            show_commands: default_show_commands(),
        }
    }
}

impl CommandCatalog {
    /// Resolve a command alias for the given OS tag.
    #[must_use]
    pub fn resolve(&self, os_tag: &str, alias: &str) -> Option<&str> {
        self.show_commands
            .get(os_tag)
            .and_then(|table| table.get(alias))
            .map(String::as_str)
    }

    /// Aliases available for the given OS tag, sorted for stable display.
    #[must_use]
    pub fn aliases(&self, os_tag: &str) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .show_commands
            .get(os_tag)
            .map(|table| table.keys().map(String::as_str).collect())
            .unwrap_or_default();
        aliases.sort_unstable();
        aliases
    }
}

const fn default_ssh_port() -> u16 {
    22
}

const fn default_connect_timeout() -> u64 {
    10
}

const fn default_command_timeout() -> u64 {
    15
}

const fn default_preflight_timeout() -> u64 {
    5
}

const fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_os_type() -> String {
    "unknown".to_string()
}

fn default_device_state() -> String {
    "active".to_string()
}

fn default_bastion_id() -> String {
    "core-jump".to_string()
}

fn default_bastions() -> HashMap<String, BastionDescriptor> {
    let mut bastions = HashMap::new();
    bastions.insert(
        "core-jump".to_string(),
        BastionDescriptor {
            name: "Core SSH Jump Host".to_string(),
            description: "Primary jump host pair for network device access".to_string(),
            region: "on-prem".to_string(),
            auth_method: AuthMethod::Password,
            endpoint: BastionEndpoint::SshJump {
                host: "jump01.net.example.com".to_string(),
                fallback_host: Some("jump02.net.example.com".to_string()),
                port: 22,
            },
        },
    );
    bastions.insert(
        "legacy-jump".to_string(),
        BastionDescriptor {
            name: "Legacy SSH Jump Host".to_string(),
            description: "Deprecated single-host bastion, kept for fallback".to_string(),
            region: "on-prem".to_string(),
            auth_method: AuthMethod::Password,
            endpoint: BastionEndpoint::SshJump {
                host: "jump-legacy.net.example.com".to_string(),
                fallback_host: None,
                port: 22,
            },
        },
    );
    bastions.insert(
        "gcp-us-central".to_string(),
        BastionDescriptor {
            name: "Cloud Bastion (US Central)".to_string(),
            description: "Cloud bastion for private VPC resources".to_string(),
            region: "us-central1".to_string(),
            auth_method: AuthMethod::CloudAuth,
            endpoint: BastionEndpoint::CloudTunnel {
                instance: "bastion-6184".to_string(),
                zone: "us-central1-a".to_string(),
                project: "network-prod".to_string(),
            },
        },
    );
    bastions.insert(
        "gcp-us-west".to_string(),
        BastionDescriptor {
            name: "Cloud Bastion (US West)".to_string(),
            description: "Cloud bastion for US West private resources".to_string(),
            region: "us-west1".to_string(),
            auth_method: AuthMethod::CloudAuth,
            endpoint: BastionEndpoint::CloudTunnel {
                instance: "bastion-6185".to_string(),
                zone: "us-west1-a".to_string(),
                project: "network-prod".to_string(),
            },
        },
    );
    bastions
}

fn default_usernames() -> Vec<String> {
    [
        "neteng",
        "admin",
        "netman",
        "svc-netman",
        "bootstrap",
        "vendor",
        "netmonitor",
        "svc-netmonitor",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_device_specific() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(
        "cisco_ios".to_string(),
        ["admin", "netadmin", "operator", "root", "network", "automation", "neteng"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    map.insert(
        "arista_eos".to_string(),
        ["admin", "automation", "netadmin", "operator", "neteng"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    map.insert(
        "juniper_junos".to_string(),
        ["root", "admin", "netops", "automation", "neteng"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    map.insert(
        "sonic_cli".to_string(),
        ["admin", "netadmin", "automation", "neteng"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    map
}

fn default_cisco_extras() -> Vec<String> {
    [
        "admin",
        "root",
        "netadmin",
        "operator",
        "network",
        "monitor",
        "view",
        "automation",
        "service",
        "support",
        "neteng",
        "netman",
        "bootstrap",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_show_commands() -> HashMap<String, HashMap<String, String>> {
    fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(alias, cmd)| ((*alias).to_string(), (*cmd).to_string()))
            .collect()
    }

    let mut map = HashMap::new();
    map.insert(
        "cisco_ios".to_string(),
        table(&[
            ("version", "show version"),
            ("bgp_summary", "show ip bgp summary"),
            ("interfaces", "show interfaces brief"),
            ("routes", "show ip route"),
            ("neighbors", "show cdp neighbors brief"),
        ]),
    );
    map.insert(
        "arista_eos".to_string(),
        table(&[
            ("version", "show version"),
            ("bgp_summary", "show ip bgp summary"),
            ("interfaces", "show interfaces brief"),
            ("routes", "show ip route"),
            ("neighbors", "show lldp neighbors"),
        ]),
    );
    map.insert(
        "juniper_junos".to_string(),
        table(&[
            ("version", "show version"),
            ("bgp_summary", "show bgp summary"),
            ("interfaces", "show interfaces brief"),
            ("routes", "show route"),
            ("neighbors", "show lldp neighbors"),
        ]),
    );
    map.insert(
        "sonic_cli".to_string(),
        table(&[
            ("version", "show version"),
            ("bgp_summary", "show ip bgp summary"),
            ("interfaces", "show interfaces brief"),
            ("routes", "show ip route"),
            ("neighbors", "show lldp neighbors"),
        ]),
    );
    map
}
