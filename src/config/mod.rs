mod loader;
mod types;

pub use loader::load_config;
pub use types::{
    AuthMethod, BastionDescriptor, BastionEndpoint, CommandCatalog, Config, DeviceEntry,
    LimitsConfig, UsernamePolicy,
};
